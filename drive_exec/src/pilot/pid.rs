//! # PID controller
//!
//! Time-aware PID controller whose gains can be tuned live from another thread through a
//! [`PidTuner`] handle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Instant;
use serde::{Deserialize, Serialize};

use crate::mailbox::Mailbox;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a PID controller
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Dervative gain
    pub k_d: f64,
}

/// A PID controller
#[derive(Debug)]
pub struct PidController {
    /// Gains, shared with any tuners
    gains: Mailbox<PidGains>,

    /// Previous instant that the error was passed in
    prev_time: Option<Instant>,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Handle used to change the gains of a [`PidController`] while it is running.
///
/// Changes take effect on the controller's next evaluation.
#[derive(Debug, Clone)]
pub struct PidTuner {
    gains: Mailbox<PidGains>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }
}

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains: Mailbox::new(gains),
            integral: 0f64,
            prev_time: None,
            prev_error: None,
        }
    }

    /// Get a handle for tuning this controller's gains.
    pub fn tuner(&self) -> PidTuner {
        PidTuner {
            gains: self.gains.clone(),
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains.latest()
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }

    /// Get the value of the controller for the given error.
    ///
    /// This function is time-aware so there is no need to pass in a delta-time
    /// value.
    pub fn get(&mut self, error: f64) -> f64 {
        self.get_at(error, Instant::now())
    }

    /// Get the value of the controller for the given error measured at `now`.
    pub fn get_at(&mut self, error: f64, now: Instant) -> f64 {
        let gains = self.gains.latest();

        // A zero dt would make the derivative infinite, treat it like the first call
        let dt = match self.prev_time {
            Some(t0) if now > t0 => Some((now - t0).as_secs_f64()),
            _ => None,
        };

        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the integral, adding the raw
        // error instead would produce a large spike compared to normal operation.
        if let Some(t) = dt {
            self.integral += error * t;
        }

        // Calculate the derivative, zero without a time difference for the same reason.
        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => (error - e) / t,
            _ => 0f64,
        };

        let out = gains.k_p * error + gains.k_i * self.integral + gains.k_d * deriv;

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time = Some(now);

        out
    }

    /// Forget the integral and history, keeping the gains.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
        self.prev_time = None;
    }
}

impl PidTuner {
    pub fn gains(&self) -> PidGains {
        self.gains.latest()
    }

    pub fn set_gains(&self, gains: PidGains) {
        self.gains.publish(gains);
    }

    /// Add `delta` to the derivative gain, returning the new gain.
    pub fn step_k_d(&self, delta: f64) -> f64 {
        self.gains.update(|g| {
            g.k_d += delta;
            g.k_d
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
