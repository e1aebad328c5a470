//! # Drive mode module
//!
//! Selects which steering and throttle demands reach the actuators depending on the current
//! drive mode, and derives the run conditions used to enable the operator-only and pilot-only
//! parts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vehicle::{Part, PartError, Value, check_inputs};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Who is in control of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// The operator controls both steering and throttle
    User,

    /// The pilot steers, the operator controls the throttle
    LocalAngle,

    /// The pilot controls both steering and throttle
    Local,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown drive mode `{0}`, expected one of user, local_angle or local")]
pub struct ParseDriveModeError(String);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Part selecting the final demands.
///
/// Inputs: `user/mode, user/angle, user/throttle, pilot/angle, pilot/throttle`.
/// Outputs: `angle, throttle`.
pub struct DriveModeArbiter;

/// Part producing `run_user`, true only in [`DriveMode::User`].
pub struct UserCondition;

/// Part producing `run_pilot`, true in any mode other than [`DriveMode::User`].
pub struct PilotCondition;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Choose the `(angle, throttle)` demands to apply for the given mode.
pub fn arbitrate(
    mode: DriveMode,
    user_angle: f64,
    user_throttle: f64,
    pilot_angle: f64,
    pilot_throttle: f64,
) -> (f64, f64) {
    match mode {
        DriveMode::User => (user_angle, user_throttle),
        DriveMode::LocalAngle => (pilot_angle, user_throttle),
        DriveMode::Local => (pilot_angle, pilot_throttle),
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveMode::User => "user",
            DriveMode::LocalAngle => "local_angle",
            DriveMode::Local => "local",
        }
    }
}

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::User
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveMode {
    type Err = ParseDriveModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(DriveMode::User),
            "local_angle" => Ok(DriveMode::LocalAngle),
            "local" => Ok(DriveMode::Local),
            other => Err(ParseDriveModeError(other.to_string())),
        }
    }
}

impl Part for DriveModeArbiter {
    fn name(&self) -> &str {
        "drive_mode"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 5)?;

        // Absent pilot demands mean the pilot has never run, in which case zero is the safe demand
        let (angle, throttle) = arbitrate(
            inputs[0].mode_or(DriveMode::User)?,
            inputs[1].float_or(0.0)?,
            inputs[2].float_or(0.0)?,
            inputs[3].float_or(0.0)?,
            inputs[4].float_or(0.0)?,
        );

        Ok(vec![Value::Float(angle), Value::Float(throttle)])
    }
}

impl Part for UserCondition {
    fn name(&self) -> &str {
        "user_condition"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 1)?;
        let mode = inputs[0].mode_or(DriveMode::User)?;
        Ok(vec![Value::Bool(mode == DriveMode::User)])
    }
}

impl Part for PilotCondition {
    fn name(&self) -> &str {
        "pilot_condition"
    }

    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 1)?;
        let mode = inputs[0].mode_or(DriveMode::User)?;
        Ok(vec![Value::Bool(mode != DriveMode::User)])
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arbitrate() {
        assert_eq!(arbitrate(DriveMode::User, 0.1, 0.2, 0.3, 0.4), (0.1, 0.2));
        assert_eq!(arbitrate(DriveMode::LocalAngle, 0.1, 0.2, 0.3, 0.4), (0.3, 0.2));
        assert_eq!(arbitrate(DriveMode::Local, 0.1, 0.2, 0.3, 0.4), (0.3, 0.4));
    }

    #[test]
    fn test_parse() {
        assert_eq!("user".parse::<DriveMode>(), Ok(DriveMode::User));
        assert_eq!("local_angle".parse::<DriveMode>(), Ok(DriveMode::LocalAngle));
        assert_eq!(" local\n".parse::<DriveMode>(), Ok(DriveMode::Local));
        assert!("autopilot".parse::<DriveMode>().is_err());

        let mode: DriveMode = serde_json::from_str("\"local_angle\"").unwrap();
        assert_eq!(mode, DriveMode::LocalAngle);
        assert_eq!(DriveMode::LocalAngle.to_string(), "local_angle");
    }

    #[test]
    fn test_conditions() {
        let mut user = UserCondition;
        let mut pilot = PilotCondition;

        for (mode, is_user) in &[
            (DriveMode::User, true),
            (DriveMode::LocalAngle, false),
            (DriveMode::Local, false),
        ] {
            let inputs = [Value::Mode(*mode)];
            assert_eq!(user.run(&inputs).unwrap(), vec![Value::Bool(*is_user)]);
            assert_eq!(pilot.run(&inputs).unwrap(), vec![Value::Bool(!is_user)]);
        }

        // Never written mode reads as user
        assert_eq!(user.run(&[Value::None]).unwrap(), vec![Value::Bool(true)]);
    }

    #[test]
    fn test_arbiter_part() {
        let mut arbiter = DriveModeArbiter;

        let out = arbiter
            .run(&[
                Value::Mode(DriveMode::Local),
                Value::Float(0.1),
                Value::Float(0.2),
                Value::None,
                Value::None,
            ])
            .unwrap();
        assert_eq!(out, vec![Value::Float(0.0), Value::Float(0.0)]);

        assert!(arbiter
            .run(&[
                Value::Float(1.0),
                Value::Float(0.1),
                Value::Float(0.2),
                Value::None,
                Value::None,
            ])
            .is_err());
        assert!(arbiter.run(&[Value::Mode(DriveMode::User)]).is_err());
    }
}
