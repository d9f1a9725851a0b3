//! Reading type and source trait for power telemetry.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Whether a reading came from the telemetry backend or was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Ok,
    /// The query failed and the reading is a 0 W placeholder.
    Degraded,
}

/// A single instantaneous power reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    /// Aggregate power in watts, never negative
    pub watts: f64,
    /// Monotonic time the reading was taken
    pub taken_at: Instant,
    pub status: ReadingStatus,
}

impl PowerReading {
    pub fn ok(watts: f64) -> Self {
        PowerReading {
            watts: watts.max(0.0),
            taken_at: Instant::now(),
            status: ReadingStatus::Ok,
        }
    }

    pub fn degraded() -> Self {
        PowerReading {
            watts: 0.0,
            taken_at: Instant::now(),
            status: ReadingStatus::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == ReadingStatus::Degraded
    }
}

/// Source of instantaneous power readings.
///
/// Implementations must not return errors; a failed read is reported as
/// `PowerReading::degraded()`. Each call is an independent round trip.
pub trait PowerSource: Send + Sync {
    /// Short name used in log lines (e.g., "prometheus").
    fn name(&self) -> &str;

    /// Take one reading.
    fn sample(&self) -> PowerReading;
}
