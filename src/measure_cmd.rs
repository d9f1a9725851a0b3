//! `measure`: discover, build and run every unit, write the result table.

use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::core::{EnvironmentInfo, Results};
use crate::discovery::{Catalog, discover};
use crate::engine::{Orchestrator, ProcessMonitor};
use crate::storage::{RepetitionLog, ResultSink};
use crate::telemetry::{PowerSource, PrometheusClient};
use crate::HarnessResult;

/// Discover units under the configured root, honouring the `only` filter.
pub fn discover_units(cfg: &HarnessConfig) -> Catalog {
    let mut catalog = discover(&cfg.root, &cfg.languages);
    if let Some(only) = &cfg.only {
        catalog.retain_algorithm(only);
    }
    catalog
}

/// Measure every discovered unit against `source` and return the result rows.
pub fn measure(cfg: &HarnessConfig, source: &dyn PowerSource) -> HarnessResult<Results> {
    cfg.validate()?;

    let catalog = discover_units(cfg);
    if catalog.is_empty() {
        warn!(root = %cfg.root.display(), "no benchmark units found");
    } else {
        info!(units = catalog.len(), algorithms = catalog.algorithms().count(), "discovered");
    }

    let monitor = ProcessMonitor::new(source, cfg.monitor_settings());
    let log = cfg
        .repetition_log
        .as_ref()
        .map(|p| RepetitionLog::new(p).with_environment(EnvironmentInfo::detect()));

    let mut orchestrator = Orchestrator::new(&monitor, cfg);
    if let Some(log) = log.as_ref() {
        orchestrator = orchestrator.with_repetition_log(log);
    }

    let mut results = Results::new();
    orchestrator.run_all(&catalog, &mut results);
    Ok(results)
}

pub fn run(cfg: HarnessConfig) -> HarnessResult<()> {
    cfg.validate()?;
    let client = PrometheusClient::new(cfg.prometheus_config())?;
    info!(endpoint = %client.config().endpoint(), query = %cfg.query, "telemetry");

    let results = measure(&cfg, &client)?;
    ResultSink::new().write(&results, &cfg.output)?;

    for row in results.rows() {
        println!(
            "{:<12} {:<20} {:<5} energy={:>12} duration={:.3}s",
            row.language, row.algorithm, row.phase, row.energy, row.duration_seconds
        );
    }
    println!(
        "measure: rows={} failed={} output={}",
        results.len(),
        results.failed_count(),
        cfg.output.display()
    );
    Ok(())
}
