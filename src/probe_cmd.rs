//! `probe`: take a few telemetry readings to check the power source.

use std::time::{Duration, Instant};

use crate::config::HarnessConfig;
use crate::telemetry::{PowerSource, PrometheusClient};
use crate::HarnessResult;

/// Summary of a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSummary {
    pub readings: usize,
    pub degraded: usize,
    /// Mean over non-degraded readings
    pub mean_watts: Option<f64>,
    pub max_watts: Option<f64>,
}

/// Take `count` readings spaced by `interval`.
pub fn probe(source: &dyn PowerSource, count: usize, interval: Duration) -> ProbeSummary {
    let mut ok = Vec::with_capacity(count);
    let mut degraded = 0;
    for i in 0..count {
        let tick = Instant::now();
        let reading = source.sample();
        if reading.is_degraded() {
            degraded += 1;
            println!("#{i:<3} degraded");
        } else {
            println!("#{i:<3} {:.3} W", reading.watts);
            ok.push(reading.watts);
        }
        if i + 1 < count {
            std::thread::sleep(interval.saturating_sub(tick.elapsed()));
        }
    }
    let mean_watts = (!ok.is_empty()).then(|| ok.iter().sum::<f64>() / ok.len() as f64);
    let max_watts = ok.iter().cloned().reduce(f64::max);
    ProbeSummary {
        readings: count,
        degraded,
        mean_watts,
        max_watts,
    }
}

pub fn run(cfg: HarnessConfig, count: usize) -> HarnessResult<()> {
    cfg.validate()?;
    let client = PrometheusClient::new(cfg.prometheus_config())?;
    println!("probe: {} query={}", client.config().endpoint(), cfg.query);
    let summary = probe(&client, count, cfg.sample_interval());
    match summary.mean_watts {
        Some(mean) => println!(
            "probe: readings={} degraded={} mean={:.3}W max={:.3}W idle_baseline={:.3}W",
            summary.readings,
            summary.degraded,
            mean,
            summary.max_watts.unwrap_or(mean),
            cfg.idle_power_watts
        ),
        None => println!(
            "probe: readings={} degraded={} (telemetry unavailable)",
            summary.readings, summary.degraded
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::ScriptedPowerSource;

    #[test]
    fn test_probe_summary() {
        let source = ScriptedPowerSource::sequence([Some(2.0), None, Some(4.0)], None);
        let summary = probe(&source, 3, Duration::from_millis(1));
        assert_eq!(summary.readings, 3);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.mean_watts, Some(3.0));
        assert_eq!(summary.max_watts, Some(4.0));
    }

    #[test]
    fn test_probe_all_degraded() {
        let source = ScriptedPowerSource::unavailable();
        let summary = probe(&source, 2, Duration::from_millis(1));
        assert_eq!(summary.degraded, 2);
        assert!(summary.mean_watts.is_none());
    }
}
