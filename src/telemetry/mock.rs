//! Scripted power source for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::traits::{PowerReading, PowerSource};

/// Power source that replays a fixed script of readings.
///
/// `Some(w)` yields an ok reading of `w` watts, `None` a degraded reading.
/// Once the script is exhausted the fallback is repeated.
pub struct ScriptedPowerSource {
    script: Mutex<VecDeque<Option<f64>>>,
    fallback: Option<f64>,
    calls: AtomicUsize,
}

impl ScriptedPowerSource {
    /// Always report the same power.
    pub fn constant(watts: f64) -> Self {
        ScriptedPowerSource {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(watts),
            calls: AtomicUsize::new(0),
        }
    }

    /// Telemetry that is always down.
    pub fn unavailable() -> Self {
        ScriptedPowerSource {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Replay `script`, then keep repeating `fallback`.
    pub fn sequence(script: impl IntoIterator<Item = Option<f64>>, fallback: Option<f64>) -> Self {
        ScriptedPowerSource {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of readings taken so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PowerSource for ScriptedPowerSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sample(&self) -> PowerReading {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front().unwrap_or(self.fallback),
            Err(_) => self.fallback,
        };
        match next {
            Some(watts) => PowerReading::ok(watts),
            None => PowerReading::degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_source() {
        let source = ScriptedPowerSource::constant(5.0);
        assert_eq!(source.sample().watts, 5.0);
        assert_eq!(source.sample().watts, 5.0);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_sequence_then_fallback() {
        let source = ScriptedPowerSource::sequence([Some(1.0), None, Some(3.0)], Some(9.0));
        assert_eq!(source.sample().watts, 1.0);
        assert!(source.sample().is_degraded());
        assert_eq!(source.sample().watts, 3.0);
        assert_eq!(source.sample().watts, 9.0);
    }

    #[test]
    fn test_unavailable_source() {
        let source = ScriptedPowerSource::unavailable();
        let reading = source.sample();
        assert!(reading.is_degraded());
        assert_eq!(reading.watts, 0.0);
    }
}
