//! Riemann-sum energy integration with idle-power subtraction.

use std::time::Duration;

use crate::telemetry::PowerReading;

/// Accumulates power readings taken at a nominal cadence into Joules.
///
/// Each reading contributes `max(0, watts - idle_watts) * interval`. The
/// nominal interval is used even when readings arrive late, and each
/// contribution is clamped at zero so a single low reading cannot subtract
/// energy.
#[derive(Debug, Clone)]
pub struct EnergyIntegrator {
    interval_secs: f64,
    idle_watts: f64,
    joules: f64,
    samples: usize,
    degraded_samples: usize,
}

impl EnergyIntegrator {
    pub fn new(interval: Duration, idle_watts: f64) -> Self {
        EnergyIntegrator {
            interval_secs: interval.as_secs_f64(),
            idle_watts,
            joules: 0.0,
            samples: 0,
            degraded_samples: 0,
        }
    }

    /// Feed one reading.
    pub fn add(&mut self, reading: &PowerReading) {
        self.add_watts(reading.watts);
        if reading.is_degraded() {
            self.degraded_samples += 1;
        }
    }

    fn add_watts(&mut self, watts: f64) {
        self.joules += (watts - self.idle_watts).max(0.0) * self.interval_secs;
        self.samples += 1;
    }

    pub fn joules(&self) -> f64 {
        self.joules
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn degraded_samples(&self) -> usize {
        self.degraded_samples
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn idle_watts(&self) -> f64 {
        self.idle_watts
    }
}

/// Integrate a plain series of wattages.
pub fn integrate(interval: Duration, idle_watts: f64, watts: impl IntoIterator<Item = f64>) -> f64 {
    let mut integrator = EnergyIntegrator::new(interval, idle_watts);
    for w in watts {
        integrator.add_watts(w);
    }
    integrator.joules()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(100);

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sum_above_idle() {
        // (3.8-1.8 + 2.8-1.8 + 1.8-1.8) * 0.1 = 0.3
        let e = integrate(DT, 1.8, [3.8, 2.8, 1.8]);
        assert!(close(e, 0.3), "got {e}");
    }

    #[test]
    fn test_matches_closed_form() {
        let watts: [f64; 7] = [5.0, 0.5, 2.0, 7.25, 1.8, 0.0, 3.3];
        let idle: f64 = 1.8;
        let expected: f64 = DT.as_secs_f64() * watts.iter().map(|w| (w - idle).max(0.0)).sum::<f64>();
        assert!(close(integrate(DT, idle, watts), expected));
    }

    #[test]
    fn test_all_below_idle_is_exactly_zero() {
        let e = integrate(DT, 1.8, [0.0, 1.0, 1.79, 1.8]);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn test_no_idle_subtraction() {
        let e = integrate(Duration::from_secs(1), 0.0, [2.0, 2.0]);
        assert!(close(e, 4.0));
    }

    #[test]
    fn test_counts_degraded_readings() {
        let mut integrator = EnergyIntegrator::new(DT, 1.0);
        integrator.add(&PowerReading::ok(3.0));
        integrator.add(&PowerReading::degraded());
        integrator.add(&PowerReading::ok(2.0));
        assert_eq!(integrator.samples(), 3);
        assert_eq!(integrator.degraded_samples(), 1);
        assert!(close(integrator.joules(), 0.3));
    }

    #[test]
    fn test_empty_is_zero() {
        let integrator = EnergyIntegrator::new(DT, 1.8);
        assert_eq!(integrator.joules(), 0.0);
        assert_eq!(integrator.samples(), 0);
    }
}
