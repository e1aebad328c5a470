//! # Pilot module
//!
//! The pilot retraces a previously recorded path. The cross track error to the recorded path is
//! fed through a PID controller to produce the steering demand, while the throttle is held at a
//! fixed value.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod path;
pub mod pid;

pub use path::{CrossTrackError, PathError, PathRecorder, RecordedPath};
pub use pid::{PidController, PidGains, PidTuner};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use crate::vehicle::{check_inputs, Part, PartError, Value};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PID path tracking pilot.
///
/// Inputs: `cte/error`. Outputs: `pilot/angle, pilot/throttle`.
///
/// Should be registered with the `run_pilot` run condition so that the controller's integral and
/// history are left untouched while the operator drives.
pub struct PidPilot {
    pid: PidController,

    /// Sign relating a positive controller output to the steering direction which brings the
    /// vehicle back onto the path, either 1 or -1
    steering_sign: f64,

    /// Fixed throttle demand
    throttle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidPilot {
    pub fn new(pid: PidController, steering_sign: f64, throttle: f64) -> Self {
        Self {
            pid,
            steering_sign: steering_sign.signum(),
            throttle,
        }
    }

    pub fn tuner(&self) -> PidTuner {
        self.pid.tuner()
    }
}

impl Part for PidPilot {
    fn name(&self) -> &str {
        "pid_pilot"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 1)?;
        let cte = inputs[0].float_or(0.0)?;

        let angle = self.steering_sign * self.pid.get(cte);

        trace!("cte: {:.4}, angle: {:.4}", cte, angle);

        Ok(vec![Value::Float(angle), Value::Float(self.throttle)])
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pilot_outputs() {
        let pid = PidController::new(PidGains::new(2.0, 0.0, 0.0));
        let mut pilot = PidPilot::new(pid, -1.0, 0.3);

        // Vehicle left of the path steers the other way
        assert_eq!(
            pilot.run(&[Value::Float(0.25)]).unwrap(),
            vec![Value::Float(-0.5), Value::Float(0.3)]
        );
        assert_eq!(
            pilot.run(&[Value::None]).unwrap(),
            vec![Value::Float(0.0), Value::Float(0.3)]
        );
        assert!(pilot.run(&[]).is_err());
    }
}
