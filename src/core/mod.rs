//! Core types for energy-bench.
//!
//! Data model shared across the harness: benchmark units, per-invocation
//! measurements, aggregated result rows and the repetition log record.

pub mod env;
pub mod schema;

pub use env::EnvironmentInfo;
pub use schema::{
    BenchmarkUnit, EnergyMeasurement, EnergyValue, ExitOutcome, FAILED_MARKER, Phase,
    RepetitionRecord, Results, RunResult, SCHEMA_VERSION,
};
