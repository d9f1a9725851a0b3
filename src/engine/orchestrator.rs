//! Build/run orchestration over discovered units.
//!
//! Every unit is built once and then run `runs` times through a `Monitor`.
//! Execution is strictly sequential: concurrent processes would share the
//! power rail and corrupt each other's readings.

use tracing::{error, info, info_span, warn};

use crate::config::HarnessConfig;
use crate::core::{
    BenchmarkUnit, EnergyMeasurement, EnergyValue, Phase, RepetitionRecord, Results, RunResult,
};
use crate::discovery::Catalog;
use crate::storage::RepetitionLog;

use super::monitor::Monitor;

/// Drives the build and run phases of each unit and collects result rows.
pub struct Orchestrator<'a> {
    monitor: &'a dyn Monitor,
    config: &'a HarnessConfig,
    log: Option<&'a RepetitionLog>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(monitor: &'a dyn Monitor, config: &'a HarnessConfig) -> Self {
        Orchestrator {
            monitor,
            config,
            log: None,
        }
    }

    /// Also write one record per invocation to `log`.
    pub fn with_repetition_log(mut self, log: &'a RepetitionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Measure every unit in `catalog`, per algorithm then per language.
    pub fn run_all(&self, catalog: &Catalog, results: &mut Results) {
        for unit in catalog.units() {
            self.run_unit(unit, results);
        }
    }

    /// Build `unit` once, then run it; appends one build row and one run row.
    pub fn run_unit(&self, unit: &BenchmarkUnit, results: &mut Results) {
        let _span = info_span!("unit", unit = %unit.label()).entered();
        info!("benchmark");
        let build = self.build_phase(unit);
        let build_failed = build.energy.is_failed();
        results.push(build);

        if build_failed && self.config.skip_run_on_failed_build {
            warn!(unit = %unit.label(), "build failed, skipping run phase");
            results.push(failed_row(unit, Phase::Run, 0.0));
            return;
        }
        results.push(self.run_phase(unit));
    }

    /// Invoke the build command once.
    pub fn build_phase(&self, unit: &BenchmarkUnit) -> RunResult {
        match self.invoke(unit, Phase::Build, 0) {
            Some(m) if m.succeeded => RunResult {
                language: unit.language.clone(),
                algorithm: unit.algorithm.clone(),
                phase: Phase::Build,
                energy: EnergyValue::Measured(m.joules),
                duration_seconds: m.duration_seconds,
            },
            Some(m) => failed_row(unit, Phase::Build, m.duration_seconds),
            None => failed_row(unit, Phase::Build, 0.0),
        }
    }

    /// Invoke the run command `runs` times and aggregate.
    pub fn run_phase(&self, unit: &BenchmarkUnit) -> RunResult {
        let required = self.config.runs;
        let measurements: Vec<EnergyMeasurement> = (0..required)
            .filter_map(|rep| self.invoke(unit, Phase::Run, rep))
            .collect();
        let row = aggregate_runs(unit, required, &measurements);
        match row.energy {
            EnergyValue::Measured(j) => {
                info!(unit = %unit.label(), joules = j, duration_s = row.duration_seconds, "run phase complete")
            }
            EnergyValue::Failed => {
                let ok = measurements.iter().filter(|m| m.succeeded).count();
                warn!(unit = %unit.label(), succeeded = ok, required, "run phase failed")
            }
        }
        row
    }

    /// One monitored invocation. `None` when the command could not be started.
    fn invoke(
        &self,
        unit: &BenchmarkUnit,
        phase: Phase,
        repetition: usize,
    ) -> Option<EnergyMeasurement> {
        let mut record = RepetitionRecord::new(unit, phase, repetition);

        let outcome = self
            .config
            .commands_for(&unit.language)
            .argv(phase)
            .map_err(|e| e.to_string())
            .and_then(|argv| {
                info!(unit = %unit.label(), %phase, repetition, command = ?argv, "running");
                self.monitor
                    .monitor(&argv, &unit.path)
                    .map_err(|e| e.to_string())
            });

        let measurement = match outcome {
            Ok(m) => {
                if !m.succeeded {
                    warn!(unit = %unit.label(), %phase, repetition, outcome = ?m.outcome, "invocation failed");
                } else {
                    info!(
                        unit = %unit.label(),
                        %phase,
                        repetition,
                        joules = m.joules,
                        duration_s = m.duration_seconds,
                        "finished"
                    );
                }
                if m.is_degraded() {
                    warn!(
                        unit = %unit.label(),
                        %phase,
                        repetition,
                        degraded = m.degraded_samples,
                        samples = m.samples,
                        "measurement taken during telemetry outage"
                    );
                }
                record.measurement = Some(m.clone());
                Some(m)
            }
            Err(e) => {
                error!(unit = %unit.label(), %phase, repetition, "launch failed: {e}");
                record.launch_error = Some(e);
                None
            }
        };

        if let Some(log) = self.log {
            if let Err(e) = log.append(&record) {
                warn!("failed to write repetition log: {e}");
            }
        }
        measurement
    }
}

/// Aggregate the run-phase measurements of one unit.
///
/// Energy and duration are means over the successful repetitions. The row is
/// marked failed when fewer than `required` repetitions succeeded, even if
/// some did; its duration is then the mean of the successful ones (0 if none).
pub fn aggregate_runs(
    unit: &BenchmarkUnit,
    required: usize,
    measurements: &[EnergyMeasurement],
) -> RunResult {
    let ok: Vec<&EnergyMeasurement> = measurements.iter().filter(|m| m.succeeded).collect();
    let mean = |f: fn(&EnergyMeasurement) -> f64| {
        if ok.is_empty() {
            0.0
        } else {
            ok.iter().map(|m| f(m)).sum::<f64>() / ok.len() as f64
        }
    };
    let duration_seconds = mean(|m| m.duration_seconds);
    let energy = if ok.len() < required || ok.is_empty() {
        EnergyValue::Failed
    } else {
        EnergyValue::Measured(mean(|m| m.joules))
    };
    RunResult {
        language: unit.language.clone(),
        algorithm: unit.algorithm.clone(),
        phase: Phase::Run,
        energy,
        duration_seconds,
    }
}

fn failed_row(unit: &BenchmarkUnit, phase: Phase, duration_seconds: f64) -> RunResult {
    RunResult {
        language: unit.language.clone(),
        algorithm: unit.algorithm.clone(),
        phase,
        energy: EnergyValue::Failed,
        duration_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExitOutcome;
    use crate::engine::mock::{ScriptedMonitor, ScriptedOutcome};
    use std::sync::{Arc, Mutex};

    fn unit() -> BenchmarkUnit {
        BenchmarkUnit::new("c", "nbody", "/bench/c/nbody")
    }

    fn ok(joules: f64, duration_seconds: f64) -> EnergyMeasurement {
        EnergyMeasurement {
            joules,
            duration_seconds,
            succeeded: true,
            samples: 10,
            degraded_samples: 0,
            outcome: ExitOutcome::Exited { code: 0 },
        }
    }

    fn failed() -> EnergyMeasurement {
        EnergyMeasurement {
            joules: 0.0,
            duration_seconds: 1.0,
            succeeded: false,
            samples: 10,
            degraded_samples: 0,
            outcome: ExitOutcome::Exited { code: 1 },
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unit_events_carry_unit_span() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        let monitor = ScriptedMonitor::always(ScriptedOutcome::success(1.0));
        let config = HarnessConfig {
            runs: 1,
            ..Default::default()
        };
        tracing::subscriber::with_default(subscriber, || {
            let mut results = Results::new();
            Orchestrator::new(&monitor, &config).run_unit(&unit(), &mut results);
        });

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("unit{unit=c-nbody}"), "{out}");
        assert!(out.contains("run phase complete"), "{out}");
    }

    #[test]
    fn test_aggregate_all_succeed_is_mean() {
        let row = aggregate_runs(&unit(), 3, &[ok(10.0, 1.0), ok(12.0, 2.0), ok(14.0, 3.0)]);
        assert_eq!(row.energy, EnergyValue::Measured(12.0));
        assert_eq!(row.duration_seconds, 2.0);
        assert_eq!(row.phase, Phase::Run);
    }

    #[test]
    fn test_aggregate_one_failure_marks_failed() {
        let row = aggregate_runs(&unit(), 3, &[ok(10.0, 1.0), failed(), ok(14.0, 3.0)]);
        assert_eq!(row.energy, EnergyValue::Failed);
        assert_eq!(row.duration_seconds, 2.0);
    }

    #[test]
    fn test_aggregate_missing_launches_marks_failed() {
        // Two launches only, third could not start
        let row = aggregate_runs(&unit(), 3, &[ok(10.0, 1.0), ok(12.0, 1.0)]);
        assert!(row.energy.is_failed());
    }

    #[test]
    fn test_aggregate_nothing_succeeded() {
        let row = aggregate_runs(&unit(), 2, &[failed(), failed()]);
        assert!(row.energy.is_failed());
        assert_eq!(row.duration_seconds, 0.0);
    }

    #[test]
    fn test_failed_build_skips_run_by_default() {
        let monitor = ScriptedMonitor::new([ScriptedOutcome::failure()]);
        let config = HarnessConfig {
            runs: 3,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(&monitor, &config);
        let mut results = Results::new();
        orchestrator.run_unit(&unit(), &mut results);

        assert_eq!(monitor.calls().len(), 1);
        assert_eq!(results.len(), 2);
        assert!(results.rows()[0].energy.is_failed());
        assert!(results.rows()[1].energy.is_failed());
        assert_eq!(results.rows()[1].duration_seconds, 0.0);
    }

    #[test]
    fn test_failed_build_runs_when_skip_disabled() {
        let monitor = ScriptedMonitor::new([ScriptedOutcome::failure()])
            .with_fallback(ScriptedOutcome::success(4.0));
        let config = HarnessConfig {
            runs: 2,
            skip_run_on_failed_build: false,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(&monitor, &config);
        let mut results = Results::new();
        orchestrator.run_unit(&unit(), &mut results);

        assert_eq!(monitor.calls().len(), 3);
        assert!(results.rows()[0].energy.is_failed());
        assert_eq!(results.rows()[1].energy, EnergyValue::Measured(4.0));
    }
}
