//! # Localisation module
//!
//! Provides the vehicle's position on the ground plane, either by dead reckoning from the wheel
//! odometry and steering angle ([`kinematics`]) or from an external pose estimation server fed
//! with the wheel odometry ([`odom_client`]).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod kinematics;
pub mod odom_client;
pub mod odom_server;
pub mod parts;

pub use kinematics::CarKinematics;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vehicle::PartError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and heading of the vehicle on the ground plane.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position along the X axis in meters
    pub x: f64,

    /// Position along the Y axis in meters
    pub y: f64,

    /// Heading in radians, anticlockwise from the X axis, in the range [0, 2pi)
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum LocError {
    #[error("The wheelbase must be a positive finite number of meters, got {0}")]
    InvalidWheelbase(f64),

    #[error("Steering angle {0} rad has no defined turn radius")]
    SteeringSingularity(f64),

    #[error("Non-finite odometry input (distance: {dist_m}, steering: {steer_rad})")]
    NonFiniteInput { dist_m: f64, steer_rad: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x: f64, y: f64, heading_rad: f64) -> Self {
        Self {
            x,
            y,
            heading_rad: util::maths::wrap_2pi(heading_rad),
        }
    }
}

impl From<LocError> for PartError {
    fn from(e: LocError) -> Self {
        PartError::Failed(Box::new(e))
    }
}
