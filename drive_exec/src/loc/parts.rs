//! # Localisation parts
//!
//! Vehicle parts wrapping the localisation algorithms.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use util::maths::lin_map;

use super::{CarKinematics, LocError, Pose2};
use crate::{
    mailbox::Mailbox,
    vehicle::{check_inputs, Part, PartError, Value},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts the normalised operator steering in [-1, 1] into a wheel angle in radians.
///
/// Inputs: `user/angle`. Outputs: `steering/radian`.
pub struct SteerToRad {
    max_steer_rad: f64,
}

/// Dead reckoning localiser.
///
/// Inputs: `enc/delta_dist_m, steering/radian`. Outputs: `pos/x, pos/y`.
pub struct KinematicLocaliser {
    kinematics: CarKinematics,
}

/// Shifts positions so that a chosen point becomes the origin.
///
/// Inputs: `pos/x, pos/y`. Outputs: `pos/x, pos/y`.
pub struct OriginOffset {
    state: Mailbox<OriginState>,
}

/// Handle used to move the origin of an [`OriginOffset`] to the last position it saw.
#[derive(Clone)]
pub struct OriginReset {
    state: Mailbox<OriginState>,
}

#[derive(Debug, Clone, Copy, Default)]
struct OriginState {
    /// Last raw position seen by the part
    last: (f64, f64),

    /// Offset added to every raw position
    offset: (f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerToRad {
    pub fn new(max_steer_rad: f64) -> Self {
        Self { max_steer_rad }
    }
}

impl Part for SteerToRad {
    fn name(&self) -> &str {
        "steer_to_rad"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 1)?;
        let steer = inputs[0].float_or(0.0)?;

        Ok(vec![Value::Float(lin_map(
            (-1.0, 1.0),
            (-self.max_steer_rad, self.max_steer_rad),
            steer,
        ))])
    }
}

impl KinematicLocaliser {
    pub fn new(start: Pose2, wheelbase_m: f64) -> Result<Self, LocError> {
        Ok(Self {
            kinematics: CarKinematics::new(start, wheelbase_m)?,
        })
    }

    pub fn pose(&self) -> Pose2 {
        self.kinematics.pose()
    }
}

impl Part for KinematicLocaliser {
    fn name(&self) -> &str {
        "kinematic_localiser"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 2)?;
        let dist_m = inputs[0].float_or(0.0)?;
        let steer_rad = inputs[1].float_or(0.0)?;

        let (x, y) = self.kinematics.update(dist_m, steer_rad)?;

        Ok(vec![Value::Float(x), Value::Float(y)])
    }
}

impl OriginOffset {
    pub fn new() -> Self {
        Self {
            state: Mailbox::default(),
        }
    }

    pub fn reset_handle(&self) -> OriginReset {
        OriginReset {
            state: self.state.clone(),
        }
    }
}

impl Default for OriginOffset {
    fn default() -> Self {
        Self::new()
    }
}

impl Part for OriginOffset {
    fn name(&self) -> &str {
        "origin_offset"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 2)?;
        let x = inputs[0].float_or(0.0)?;
        let y = inputs[1].float_or(0.0)?;

        let offset = self.state.update(|s| {
            s.last = (x, y);
            s.offset
        });

        Ok(vec![Value::Float(x + offset.0), Value::Float(y + offset.1)])
    }
}

impl OriginReset {
    /// Make the last position seen by the part the new origin.
    pub fn init_to_last(&self) {
        let (x, y) = self.state.update(|s| {
            s.offset = (-s.last.0, -s.last.1);
            s.last
        });

        info!("Origin reset to ({:.3}, {:.3})", x, y);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_steer_to_rad() {
        let max = 15f64.to_radians();
        let mut part = SteerToRad::new(max);

        let out = part.run(&[Value::Float(-1.0)]).unwrap();
        assert_abs_diff_eq!(out[0].as_f64().unwrap(), -max, epsilon = 1e-12);

        let out = part.run(&[Value::Float(0.5)]).unwrap();
        assert_abs_diff_eq!(out[0].as_f64().unwrap(), 0.5 * max, epsilon = 1e-12);

        assert_eq!(part.run(&[Value::None]).unwrap(), vec![Value::Float(0.0)]);
    }

    #[test]
    fn test_localiser_part() {
        let mut part = KinematicLocaliser::new(Pose2::default(), 0.017).unwrap();

        let out = part.run(&[Value::Float(0.1), Value::Float(0.0)]).unwrap();
        assert_eq!(out, vec![Value::Float(0.1), Value::Float(0.0)]);

        // Encoder not yet reporting
        let out = part.run(&[Value::None, Value::None]).unwrap();
        assert_eq!(out, vec![Value::Float(0.1), Value::Float(0.0)]);

        // Singularities fail the part
        assert!(part
            .run(&[Value::Float(0.1), Value::Float(std::f64::consts::FRAC_PI_2)])
            .is_err());
        assert!(KinematicLocaliser::new(Pose2::default(), 0.0).is_err());
    }

    #[test]
    fn test_origin_reset() {
        let mut part = OriginOffset::new();
        let reset = part.reset_handle();

        let out = part.run(&[Value::Float(3.0), Value::Float(-2.0)]).unwrap();
        assert_eq!(out, vec![Value::Float(3.0), Value::Float(-2.0)]);

        reset.init_to_last();

        let out = part.run(&[Value::Float(3.0), Value::Float(-2.0)]).unwrap();
        assert_eq!(out, vec![Value::Float(0.0), Value::Float(0.0)]);

        let out = part.run(&[Value::Float(4.0), Value::Float(-1.5)]).unwrap();
        assert_eq!(out, vec![Value::Float(1.0), Value::Float(0.5)]);
    }
}
