//! Scripted monitor for testing orchestration without spawning processes.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::{EnergyMeasurement, ExitOutcome};

use super::monitor::{Monitor, MonitorError};

/// One scripted invocation result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    /// Exit code 0 with the given energy and duration.
    Success { joules: f64, duration_seconds: f64 },
    /// Non-zero exit after the given duration.
    Failure { code: i32, duration_seconds: f64 },
    /// Killed after the per-invocation timeout.
    TimedOut { duration_seconds: f64 },
    /// The command could not be started.
    LaunchFailure,
}

impl ScriptedOutcome {
    pub fn success(joules: f64) -> Self {
        ScriptedOutcome::Success {
            joules,
            duration_seconds: 1.0,
        }
    }

    pub fn failure() -> Self {
        ScriptedOutcome::Failure {
            code: 1,
            duration_seconds: 1.0,
        }
    }
}

/// A monitor invocation seen by `ScriptedMonitor`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: Vec<String>,
    pub working_dir: PathBuf,
}

/// Monitor that replays scripted outcomes in call order.
///
/// When the script runs out, `fallback` is used for every further call.
pub struct ScriptedMonitor {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fallback: ScriptedOutcome,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedMonitor {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        ScriptedMonitor {
            script: Mutex::new(script.into_iter().collect()),
            fallback: ScriptedOutcome::success(1.0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call yields `outcome`.
    pub fn always(outcome: ScriptedOutcome) -> Self {
        Self::new([]).with_fallback(outcome)
    }

    pub fn with_fallback(mut self, outcome: ScriptedOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Monitor for ScriptedMonitor {
    fn monitor(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<EnergyMeasurement, MonitorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                command: command.to_vec(),
                working_dir: working_dir.to_path_buf(),
            });
        }
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        let measurement = |joules: f64, duration_seconds: f64, outcome: ExitOutcome| {
            let succeeded = outcome.is_success();
            EnergyMeasurement {
                joules: if succeeded { joules } else { 0.0 },
                duration_seconds,
                succeeded,
                samples: 0,
                degraded_samples: 0,
                outcome,
            }
        };

        match next {
            ScriptedOutcome::Success {
                joules,
                duration_seconds,
            } => Ok(measurement(joules, duration_seconds, ExitOutcome::Exited { code: 0 })),
            ScriptedOutcome::Failure {
                code,
                duration_seconds,
            } => Ok(measurement(0.0, duration_seconds, ExitOutcome::Exited { code })),
            ScriptedOutcome::TimedOut { duration_seconds } => {
                Ok(measurement(0.0, duration_seconds, ExitOutcome::TimedOut))
            }
            ScriptedOutcome::LaunchFailure => Err(MonitorError::Launch {
                program: command.first().cloned().unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted launch failure"),
            }),
        }
    }
}
