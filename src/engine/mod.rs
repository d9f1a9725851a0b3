//! Measurement engine.
//!
//! - **integrator**: turns power readings into Joules above the idle baseline.
//! - **monitor**: runs one command while a sampler thread feeds the integrator.
//! - **orchestrator**: builds and runs every discovered unit through a `Monitor`
//!   and aggregates repetitions into result rows.
//!
//! `Monitor` is the seam between orchestration and real processes; tests use
//! `ScriptedMonitor` in its place.

pub mod integrator;
pub mod mock;
pub mod monitor;
pub mod orchestrator;

pub use integrator::{EnergyIntegrator, integrate};
pub use mock::{RecordedCall, ScriptedMonitor, ScriptedOutcome};
pub use monitor::{Monitor, MonitorError, MonitorSettings, ProcessMonitor};
pub use orchestrator::{Orchestrator, aggregate_runs};
