//! Record types shared by discovery, orchestration and storage.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::env::EnvironmentInfo;

/// Schema version of the repetition log records
pub const SCHEMA_VERSION: u32 = 1;

/// Literal written in place of an energy figure that could not be trusted.
pub const FAILED_MARKER: &str = "failed";

/// One buildable/runnable artifact, keyed by (language, algorithm).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BenchmarkUnit {
    pub language: String,
    pub algorithm: String,
    pub path: PathBuf,
}

impl BenchmarkUnit {
    pub fn new(
        language: impl Into<String>,
        algorithm: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        BenchmarkUnit {
            language: language.into(),
            algorithm: algorithm.into(),
            path: path.into(),
        }
    }

    /// `language-algorithm`, used in log lines.
    pub fn label(&self) -> String {
        format!("{}-{}", self.language, self.algorithm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Build,
    Run,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Build => "build",
            Phase::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a monitored process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Exited on its own with the given code.
    Exited { code: i32 },
    /// Terminated by a signal it did not ask for.
    Signalled,
    /// Killed by the monitor after the per-invocation timeout.
    TimedOut,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited { code: 0 })
    }
}

/// Outcome of monitoring a single process invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyMeasurement {
    /// Integrated energy above the idle baseline. Always 0.0 when the process failed.
    pub joules: f64,
    pub duration_seconds: f64,
    pub succeeded: bool,
    pub samples: usize,
    /// Samples substituted by 0 W because the telemetry query failed
    pub degraded_samples: usize,
    pub outcome: ExitOutcome,
}

impl EnergyMeasurement {
    pub fn is_degraded(&self) -> bool {
        self.degraded_samples > 0
    }
}

/// Energy column of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyValue {
    Measured(f64),
    Failed,
}

impl EnergyValue {
    pub fn is_failed(&self) -> bool {
        matches!(self, EnergyValue::Failed)
    }

    pub fn joules(&self) -> Option<f64> {
        match self {
            EnergyValue::Measured(j) => Some(*j),
            EnergyValue::Failed => None,
        }
    }
}

impl fmt::Display for EnergyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyValue::Measured(j) => write!(f, "{j:.4}"),
            EnergyValue::Failed => f.write_str(FAILED_MARKER),
        }
    }
}

/// One aggregated row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub language: String,
    pub algorithm: String,
    pub phase: Phase,
    pub energy: EnergyValue,
    pub duration_seconds: f64,
}

/// Ordered collection of result rows, threaded from the orchestrator to the sink.
#[derive(Debug, Clone, Default)]
pub struct Results {
    rows: Vec<RunResult>,
}

impl Results {
    pub fn new() -> Self {
        Results::default()
    }

    pub fn push(&mut self, row: RunResult) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[RunResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.energy.is_failed()).count()
    }

    pub fn into_rows(self) -> Vec<RunResult> {
        self.rows
    }
}

/// Per-invocation audit record written to the repetition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionRecord {
    pub schema_version: u32,
    /// ISO 8601 timestamp
    pub timestamp: String,
    pub language: String,
    pub algorithm: String,
    pub phase: Phase,
    /// Zero-based repetition index within the phase
    pub repetition: usize,
    /// Set when the command could not be started at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<EnergyMeasurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvironmentInfo>,
}

impl RepetitionRecord {
    pub fn new(unit: &BenchmarkUnit, phase: Phase, repetition: usize) -> Self {
        RepetitionRecord {
            schema_version: SCHEMA_VERSION,
            timestamp: crate::now_string(),
            language: unit.language.clone(),
            algorithm: unit.algorithm.clone(),
            phase,
            repetition,
            launch_error: None,
            measurement: None,
            env: None,
        }
    }
}
