//! `monitor`: measure a single arbitrary command.

use std::path::PathBuf;

use crate::config::HarnessConfig;
use crate::engine::{Monitor, ProcessMonitor};
use crate::telemetry::PrometheusClient;
use crate::{HarnessError, HarnessResult};

pub fn run(cfg: HarnessConfig, dir: PathBuf, command: Vec<String>) -> HarnessResult<()> {
    cfg.validate()?;
    let client = PrometheusClient::new(cfg.prometheus_config())?;
    let monitor = ProcessMonitor::new(&client, cfg.monitor_settings());

    let m = monitor
        .monitor(&command, &dir)
        .map_err(|e| HarnessError::Message(e.to_string()))?;

    println!(
        "monitor: succeeded={} energy={:.4}J duration={:.3}s samples={} degraded={} outcome={:?}",
        m.succeeded, m.joules, m.duration_seconds, m.samples, m.degraded_samples, m.outcome
    );
    if !m.succeeded {
        return Err(HarnessError::Message(format!(
            "command failed: {:?}",
            m.outcome
        )));
    }
    Ok(())
}
