//! Process monitor: runs one command while sampling power concurrently.
//!
//! Two threads cooperate per invocation. The sampler takes a reading from the
//! power source every nominal interval and sends it over a channel. The
//! supervisor (the calling thread) owns the child handle, feeds readings to the
//! integrator and polls the child for exit. When the child exits the stop
//! channel is dropped and the sampler winds down. The reading it was taking at
//! that moment is still integrated, so a process shorter than one telemetry
//! round trip gets at least one sample.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::{EnergyMeasurement, ExitOutcome};
use crate::telemetry::{PowerReading, PowerSource};

use super::integrator::EnergyIntegrator;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait on child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Runs a command to completion and reports the energy it consumed.
pub trait Monitor {
    /// Launch `command` (program followed by its arguments) in `working_dir`
    /// and block until it exits.
    ///
    /// Returns `Err` only when the process could not be started or waited on;
    /// a non-zero exit is an `Ok` measurement with `succeeded == false`.
    fn monitor(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<EnergyMeasurement, MonitorError>;
}

/// Timing knobs for the process monitor.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Nominal time between power readings
    pub sample_interval: Duration,
    /// Host power draw at rest, subtracted from every reading
    pub idle_watts: f64,
    /// How often the supervisor checks whether the child has exited
    pub liveness_poll: Duration,
    /// Kill the child after this long; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            sample_interval: Duration::from_millis(100),
            idle_watts: 1.8,
            liveness_poll: Duration::from_millis(10),
            timeout: None,
        }
    }
}

impl MonitorSettings {
    pub fn new(sample_interval: Duration, idle_watts: f64) -> Self {
        MonitorSettings {
            sample_interval,
            idle_watts,
            liveness_poll: sample_interval.min(Duration::from_millis(10)),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Monitor that spawns real OS processes and samples a `PowerSource`.
pub struct ProcessMonitor<'a> {
    source: &'a dyn PowerSource,
    settings: MonitorSettings,
}

impl<'a> ProcessMonitor<'a> {
    pub fn new(source: &'a dyn PowerSource, settings: MonitorSettings) -> Self {
        ProcessMonitor { source, settings }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Poll the child until it exits or the timeout expires, integrating readings as they arrive.
    fn supervise(
        &self,
        child: &mut Child,
        started: Instant,
        readings: &Receiver<PowerReading>,
        integrator: &mut EnergyIntegrator,
    ) -> Result<(ExitOutcome, Duration), MonitorError> {
        let poll = self.settings.liveness_poll;
        loop {
            match readings.recv_timeout(poll) {
                Ok(reading) => integrator.add(&reading),
                Err(RecvTimeoutError::Timeout) => {}
                // Sampler is gone; keep checking liveness without spinning.
                Err(RecvTimeoutError::Disconnected) => thread::sleep(poll),
            }

            match child.try_wait() {
                Ok(Some(status)) => return Ok((outcome_of(status), started.elapsed())),
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(child);
                    return Err(MonitorError::Wait(e));
                }
            }

            if let Some(limit) = self.settings.timeout {
                if started.elapsed() >= limit {
                    warn!(pid = child.id(), ?limit, "process timed out, killing");
                    kill_and_reap(child);
                    return Ok((ExitOutcome::TimedOut, started.elapsed()));
                }
            }
        }
    }
}

impl Monitor for ProcessMonitor<'_> {
    fn monitor(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<EnergyMeasurement, MonitorError> {
        let (program, args) = command.split_first().ok_or(MonitorError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!(?command, dir = %working_dir.display(), "spawning");
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| MonitorError::Launch {
            program: program.clone(),
            source,
        })?;

        let mut integrator =
            EnergyIntegrator::new(self.settings.sample_interval, self.settings.idle_watts);

        let (outcome, elapsed) = thread::scope(|scope| {
            let (reading_tx, reading_rx) = mpsc::channel();
            let (stop_tx, stop_rx) = mpsc::channel::<()>();
            let source = self.source;
            let interval = self.settings.sample_interval;
            scope.spawn(move || run_sampler(source, interval, reading_tx, stop_rx));

            let result = self.supervise(&mut child, started, &reading_rx, &mut integrator);
            drop(stop_tx);
            if result.is_ok() {
                // Ends once the sampler has sent its in-flight reading and returned.
                for reading in reading_rx.iter() {
                    integrator.add(&reading);
                }
            }
            result
        })?;

        let succeeded = outcome.is_success();
        let measurement = EnergyMeasurement {
            joules: if succeeded { integrator.joules() } else { 0.0 },
            duration_seconds: elapsed.as_secs_f64(),
            succeeded,
            samples: integrator.samples(),
            degraded_samples: integrator.degraded_samples(),
            outcome,
        };
        debug!(
            joules = measurement.joules,
            duration_s = measurement.duration_seconds,
            samples = measurement.samples,
            ?outcome,
            "process finished"
        );
        Ok(measurement)
    }
}

/// Take a reading every `interval` until `stop` is signalled or dropped.
fn run_sampler(
    source: &dyn PowerSource,
    interval: Duration,
    readings: Sender<PowerReading>,
    stop: Receiver<()>,
) {
    loop {
        let tick = Instant::now();
        if readings.send(source.sample()).is_err() {
            return;
        }
        let remaining = interval.saturating_sub(tick.elapsed());
        match stop.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn outcome_of(status: ExitStatus) -> ExitOutcome {
    match status.code() {
        Some(code) => ExitOutcome::Exited { code },
        None => ExitOutcome::Signalled,
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
