//! Power telemetry sources.
//!
//! A `PowerSource` answers "what is the aggregate power draw right now" with
//! a single tagged reading. Failures never propagate: they come back as a
//! degraded 0 W reading so a flaky backend only costs accuracy.

pub mod mock;
pub mod prometheus;
pub mod traits;

pub use mock::ScriptedPowerSource;
pub use prometheus::{PrometheusClient, PrometheusConfig, parse_power_response};
pub use traits::{PowerReading, PowerSource, ReadingStatus};
