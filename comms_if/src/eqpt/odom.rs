//! # Odometry Equipment Communications Module
//!
//! Wire format spoken with the external pose estimation server. Each exchange is a single JSON
//! request carrying the wheel odometry for one frame, answered by a single JSON reply carrying the
//! estimated position.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Identifier of the (only) wheel whose odometry is reported.
pub const DEFAULT_WHEEL_ID: u32 = 0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Odometry telemetry sent to the pose server.
///
/// Velocities are in the server's frame, where `z` is the forward axis.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct OdomRequest {
    /// Wheel the velocity was measured on
    pub wheel_id: u32,

    /// Frame counter, starts at 1 and increases by one for every request
    pub frame: u64,

    /// Lateral velocity in meters/second
    pub vel_x: f64,

    /// Vertical velocity in meters/second
    pub vel_y: f64,

    /// Forward velocity in meters/second
    pub vel_z: f64,
}

/// Position estimate returned by the pose server.
///
/// The server's `y` axis points up, so only `x` and `z` describe the ground plane. Any other
/// fields the server includes are ignored.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PoseReply {
    pub x: f64,

    #[serde(default)]
    pub y: Option<f64>,

    pub z: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomRequest {
    /// Build the request for a vehicle moving forward at `vel_ms`.
    pub fn forward(frame: u64, vel_ms: f64) -> Self {
        Self {
            wheel_id: DEFAULT_WHEEL_ID,
            frame,
            vel_x: 0.0,
            vel_y: 0.0,
            vel_z: vel_ms,
        }
    }
}

impl PoseReply {
    /// The position on the ground plane, as `(x, z)`.
    pub fn ground_position(&self) -> (f64, f64) {
        (self.x, self.z)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_request_fields() {
        let req = OdomRequest::forward(7, 0.5);
        let val: Value = serde_json::to_value(&req).unwrap();

        assert_eq!(val["wheel_id"], 0);
        assert_eq!(val["frame"], 7);
        assert_eq!(val["vel_x"], 0.0);
        assert_eq!(val["vel_y"], 0.0);
        assert_eq!(val["vel_z"], 0.5);
    }

    #[test]
    fn test_reply_parsing() {
        // Extra fields are ignored and y is dropped from the ground position
        let reply: PoseReply = serde_json::from_str(
            r#"{"x": 1.25, "y": 3.0, "z": -0.5, "rot": [0, 0, 0, 1], "tracker_confidence": 3}"#,
        )
        .unwrap();
        assert_eq!(reply.ground_position(), (1.25, -0.5));

        // y is optional
        let reply: PoseReply = serde_json::from_str(r#"{"x": 2.0, "z": 4.0}"#).unwrap();
        assert_eq!(reply.y, None);
        assert_eq!(reply.ground_position(), (2.0, 4.0));

        // z is not
        assert!(serde_json::from_str::<PoseReply>(r#"{"x": 2.0, "y": 1.0}"#).is_err());
    }
}
