//! # Blackboard
//!
//! Table of named channels that parts read their inputs from and write their outputs to. The
//! set of channels is closed, every channel is a [`Key`] variant.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;
use thiserror::Error;

use crate::mode::DriveMode;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A blackboard channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Forward velocity measured by the wheel encoder
    EncVelMS,
    /// Distance travelled since the previous encoder reading
    EncDeltaDistM,
    UserAngle,
    UserThrottle,
    UserMode,
    /// Operator steering angle converted to radians
    SteeringRadian,
    PosX,
    PosY,
    RunUser,
    RunPilot,
    CteError,
    PilotAngle,
    PilotThrottle,
    /// Final steering demand
    Angle,
    /// Final throttle demand
    Throttle,
}

/// The value held by a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Nothing has been written to the channel yet
    None,
    Bool(bool),
    Float(f64),
    Mode(DriveMode),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("Expected a {expected} value but found {found:?}")]
    TypeMismatch {
        expected: &'static str,
        found: Value,
    },

    #[error("Expected a {0} value but nothing has been written to the channel")]
    Missing(&'static str),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Last-write-wins table of channel values.
#[derive(Debug, Clone)]
pub struct Blackboard {
    values: [Value; Key::COUNT],
    seeded: [bool; Key::COUNT],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Key {
    pub const COUNT: usize = 15;

    pub const ALL: [Key; Key::COUNT] = [
        Key::EncVelMS,
        Key::EncDeltaDistM,
        Key::UserAngle,
        Key::UserThrottle,
        Key::UserMode,
        Key::SteeringRadian,
        Key::PosX,
        Key::PosY,
        Key::RunUser,
        Key::RunPilot,
        Key::CteError,
        Key::PilotAngle,
        Key::PilotThrottle,
        Key::Angle,
        Key::Throttle,
    ];

    /// The channel's name as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Key::EncVelMS => "enc/vel_m_s",
            Key::EncDeltaDistM => "enc/delta_dist_m",
            Key::UserAngle => "user/angle",
            Key::UserThrottle => "user/throttle",
            Key::UserMode => "user/mode",
            Key::SteeringRadian => "steering/radian",
            Key::PosX => "pos/x",
            Key::PosY => "pos/y",
            Key::RunUser => "run_user",
            Key::RunPilot => "run_pilot",
            Key::CteError => "cte/error",
            Key::PilotAngle => "pilot/angle",
            Key::PilotThrottle => "pilot/throttle",
            Key::Angle => "angle",
            Key::Throttle => "throttle",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::None => Err(ValueError::Missing("float")),
            other => Err(ValueError::TypeMismatch {
                expected: "float",
                found: *other,
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::None => Err(ValueError::Missing("bool")),
            other => Err(ValueError::TypeMismatch {
                expected: "bool",
                found: *other,
            }),
        }
    }

    pub fn as_mode(&self) -> Result<DriveMode, ValueError> {
        match self {
            Value::Mode(m) => Ok(*m),
            Value::None => Err(ValueError::Missing("mode")),
            other => Err(ValueError::TypeMismatch {
                expected: "mode",
                found: *other,
            }),
        }
    }

    /// Read a float, treating an unwritten channel as `default`.
    pub fn float_or(&self, default: f64) -> Result<f64, ValueError> {
        match self {
            Value::None => Ok(default),
            v => v.as_f64(),
        }
    }

    /// Read a bool, treating an unwritten channel as `default`.
    pub fn bool_or(&self, default: bool) -> Result<bool, ValueError> {
        match self {
            Value::None => Ok(default),
            v => v.as_bool(),
        }
    }

    /// Read a mode, treating an unwritten channel as `default`.
    pub fn mode_or(&self, default: DriveMode) -> Result<DriveMode, ValueError> {
        match self {
            Value::None => Ok(default),
            v => v.as_mode(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DriveMode> for Value {
    fn from(m: DriveMode) -> Self {
        Value::Mode(m)
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self {
            values: [Value::None; Key::COUNT],
            seeded: [false; Key::COUNT],
        }
    }

    /// Get the current value of a channel, `Value::None` if it has never been written.
    pub fn get(&self, key: Key) -> Value {
        self.values[key.index()]
    }

    pub fn set(&mut self, key: Key, value: Value) {
        self.values[key.index()] = value;
    }

    /// Write a value for a channel that no part produces, such as a channel fed by external
    /// equipment.
    pub fn seed(&mut self, key: Key, value: Value) {
        self.set(key, value);
        self.seeded[key.index()] = true;
    }

    pub fn is_seeded(&self, key: Key) -> bool {
        self.seeded[key.index()]
    }

    /// Collect the values of the given channels in order.
    pub fn gather(&self, keys: &[Key]) -> Vec<Value> {
        keys.iter().map(|k| self.get(*k)).collect()
    }
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys() {
        // Indices line up with ALL and names are unique
        let mut names = HashSet::new();
        for (i, k) in Key::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
            assert!(names.insert(k.name()));
        }
        assert_eq!(Key::CteError.to_string(), "cte/error");
    }

    #[test]
    fn test_last_write_wins() {
        let mut bb = Blackboard::new();
        assert_eq!(bb.get(Key::PosX), Value::None);

        bb.set(Key::PosX, Value::Float(1.0));
        bb.set(Key::PosX, 2.0f64.into());
        assert_eq!(bb.get(Key::PosX), Value::Float(2.0));
        assert!(!bb.is_seeded(Key::PosX));

        bb.seed(Key::UserMode, DriveMode::Local.into());
        assert!(bb.is_seeded(Key::UserMode));
        assert_eq!(
            bb.gather(&[Key::UserMode, Key::PosX, Key::PosY]),
            vec![Value::Mode(DriveMode::Local), Value::Float(2.0), Value::None]
        );
    }

    #[test]
    fn test_value_access() {
        assert_eq!(Value::Float(0.5).as_f64(), Ok(0.5));
        assert_eq!(Value::None.as_f64(), Err(ValueError::Missing("float")));
        assert_eq!(Value::None.float_or(0.0), Ok(0.0));
        assert_eq!(Value::None.bool_or(false), Ok(false));
        assert_eq!(Value::None.mode_or(DriveMode::User), Ok(DriveMode::User));
        assert_eq!(
            Value::Bool(true).float_or(0.0),
            Err(ValueError::TypeMismatch {
                expected: "float",
                found: Value::Bool(true)
            })
        );
        assert!(Value::Float(1.0).as_mode().is_err());
    }
}
