//! # Vehicle module
//!
//! The vehicle is a fixed rate scheduler. Parts are registered once with the blackboard channels
//! they read and write, then ticked in registration order until the vehicle is told to stop.
//!
//! Each tick:
//!
//! ```text
//!     - For each part, in registration order:
//!         - Evaluate its run condition, skipping the part unless the condition channel holds
//!           `true`. A skipped part's previous outputs stay on the blackboard.
//!         - Gather its inputs from the blackboard.
//!         - Call `run` (synchronous parts) or `run_threaded` (threaded parts).
//!         - Write its outputs back to the blackboard.
//!     - Sleep for the remainder of the tick period, or warn if the tick overran.
//! ```
//!
//! When the vehicle stops, either because the maximum number of ticks was reached, the stop
//! handle was triggered or a part failed, every part is shut down in reverse registration order.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod blackboard;
mod part;

pub use blackboard::{Blackboard, Key, Value, ValueError};
pub use part::{check_inputs, Part, PartError, ThreadedPart};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The scheduler and the parts it runs.
pub struct Vehicle {
    entries: Vec<Entry>,
    blackboard: Blackboard,
    stop: Arc<AtomicBool>,
    started: bool,
}

/// Handle used to stop a running vehicle from another thread.
///
/// The stop is seen between ticks.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleReport {
    /// Number of ticks executed
    pub ticks: u64,

    /// Number of ticks which took longer than the tick period
    pub overruns: u64,
}

/// A registered part and its wiring.
struct Entry {
    job: Job,
    inputs: Vec<Key>,
    outputs: Vec<Key>,
    run_condition: Option<Key>,
}

enum Job {
    Sync(Box<dyn Part>),
    Threaded(Box<dyn ThreadedPart>),
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("The tick rate must be a positive finite number of Hz with a representable period, got {0}")]
    InvalidRate(f64),

    #[error("The vehicle has already been started")]
    AlreadyStarted,

    #[error(
        "Part `{part}` reads `{key}` but no part writes it and it has not been seeded"
    )]
    UndeclaredKey { part: String, key: Key },

    #[error("Part `{part}` returned {found} outputs but {expected} were declared")]
    OutputMismatch {
        part: String,
        expected: usize,
        found: usize,
    },

    #[error("Part `{part}` failed: {source}")]
    PartFailed {
        part: String,
        #[source]
        source: PartError,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Vehicle {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            blackboard: Blackboard::new(),
            stop: Arc::new(AtomicBool::new(false)),
            started: false,
        }
    }

    /// Register a synchronous part.
    ///
    /// If a run condition is given the part only runs on ticks where that channel holds `true`.
    pub fn add<P: Part + 'static>(
        &mut self,
        part: P,
        inputs: &[Key],
        outputs: &[Key],
        run_condition: Option<Key>,
    ) {
        self.push(Job::Sync(Box::new(part)), inputs, outputs, run_condition);
    }

    /// Register a part whose work happens in a background thread.
    pub fn add_threaded<P: ThreadedPart + 'static>(
        &mut self,
        part: P,
        inputs: &[Key],
        outputs: &[Key],
        run_condition: Option<Key>,
    ) {
        self.push(Job::Threaded(Box::new(part)), inputs, outputs, run_condition);
    }

    /// Give an initial value to a channel, allowing it to be read without any part writing it.
    pub fn seed(&mut self, key: Key, value: Value) {
        self.blackboard.seed(key, value);
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Run the vehicle at `rate_hz` until stopped, or until `max_ticks` ticks have run.
    ///
    /// Blocks the calling thread for the whole run.
    pub fn start(
        &mut self,
        rate_hz: f64,
        max_ticks: Option<u64>,
    ) -> Result<VehicleReport, VehicleError> {
        if self.started {
            return Err(VehicleError::AlreadyStarted);
        }
        self.started = true;

        let period = tick_period(rate_hz)?;
        self.check_wiring()?;

        // Start background parts in order, shutting down everything before a part that fails
        for i in 0..self.entries.len() {
            if let Job::Threaded(ref mut part) = self.entries[i].job {
                debug!("Starting threaded part `{}`", part.name());

                if let Err(e) = part.start() {
                    let part = part.name().to_string();
                    self.shutdown_parts(i);
                    return Err(VehicleError::PartFailed { part, source: e });
                }
            }
        }

        info!(
            "Vehicle started with {} parts at {} Hz (max ticks: {:?})",
            self.entries.len(),
            rate_hz,
            max_ticks
        );

        let mut report = VehicleReport {
            ticks: 0,
            overruns: 0,
        };

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("Stop requested");
                break;
            }
            if let Some(max) = max_ticks {
                if report.ticks >= max {
                    info!("Maximum number of ticks reached");
                    break;
                }
            }

            let tick_start = Instant::now();

            if let Err(e) = self.tick() {
                self.shutdown_parts(self.entries.len());
                return Err(e);
            }
            report.ticks += 1;

            // Sleep for the rest of the tick, no catching up after an overrun
            let tick_dur = Instant::now() - tick_start;
            match period.checked_sub(tick_dur) {
                Some(d) => thread::sleep(d),
                None => {
                    report.overruns += 1;
                    warn!(
                        "Tick {} overran by {:.06} s",
                        report.ticks,
                        (tick_dur - period).as_secs_f64()
                    );
                }
            }
        }

        self.shutdown_parts(self.entries.len());

        info!(
            "Vehicle stopped after {} ticks ({} overruns)",
            report.ticks, report.overruns
        );

        Ok(report)
    }

    fn push(&mut self, job: Job, inputs: &[Key], outputs: &[Key], run_condition: Option<Key>) {
        debug!(
            "Adding part `{}` (inputs: {:?}, outputs: {:?}, run condition: {:?})",
            job.name(),
            inputs,
            outputs,
            run_condition
        );

        self.entries.push(Entry {
            job,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            run_condition,
        });
    }

    /// Check that every channel read by a part is written by some part or seeded.
    fn check_wiring(&self) -> Result<(), VehicleError> {
        let mut written = [false; Key::COUNT];
        for e in self.entries.iter() {
            for k in e.outputs.iter() {
                written[*k as usize] = true;
            }
        }

        for e in self.entries.iter() {
            for k in e.inputs.iter().chain(e.run_condition.iter()) {
                if !written[*k as usize] && !self.blackboard.is_seeded(*k) {
                    return Err(VehicleError::UndeclaredKey {
                        part: e.job.name().to_string(),
                        key: *k,
                    });
                }
            }
        }

        Ok(())
    }

    /// Run every enabled part once.
    fn tick(&mut self) -> Result<(), VehicleError> {
        let bb = &mut self.blackboard;

        for entry in self.entries.iter_mut() {
            if let Some(cond) = entry.run_condition {
                if bb.get(cond) != Value::Bool(true) {
                    continue;
                }
            }

            let inputs = bb.gather(&entry.inputs);

            let result = match entry.job {
                Job::Sync(ref mut p) => p.run(&inputs),
                Job::Threaded(ref mut p) => p.run_threaded(&inputs),
            };

            let outputs = result.map_err(|e| VehicleError::PartFailed {
                part: entry.job.name().to_string(),
                source: e,
            })?;

            if outputs.len() != entry.outputs.len() {
                return Err(VehicleError::OutputMismatch {
                    part: entry.job.name().to_string(),
                    expected: entry.outputs.len(),
                    found: outputs.len(),
                });
            }

            for (k, v) in entry.outputs.iter().zip(outputs.into_iter()) {
                bb.set(*k, v);
            }
        }

        Ok(())
    }

    /// Shut down the first `count` parts in reverse order.
    fn shutdown_parts(&mut self, count: usize) {
        for entry in self.entries[..count].iter_mut().rev() {
            debug!("Shutting down part `{}`", entry.job.name());
            entry.job.shutdown();
        }
    }
}

impl Default for Vehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl Job {
    fn name(&self) -> &str {
        match self {
            Job::Sync(p) => p.name(),
            Job::Threaded(p) => p.name(),
        }
    }

    fn shutdown(&mut self) {
        match self {
            Job::Sync(p) => p.shutdown(),
            Job::Threaded(p) => p.shutdown(),
        }
    }
}

impl StopHandle {
    /// Ask the vehicle to stop at the end of the current tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the tick period for a rate, which must be positive with a period that fits a `Duration`.
pub fn tick_period(rate_hz: f64) -> Result<Duration, VehicleError> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(VehicleError::InvalidRate(rate_hz));
    }

    Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|_| VehicleError::InvalidRate(rate_hz))
}
