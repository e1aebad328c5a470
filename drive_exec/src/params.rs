//! # Drive Executable Parameters
//!
//! This module provides the parameters of the drive executable, loaded from `drive.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;
use serde::Deserialize;
use thiserror::Error;

use crate::{loc::odom_server::OdomServerParams, mode::DriveMode};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DriveParams {
    /// Distance between the front and rear axles in meters
    pub wheelbase_m: f64,

    /// Rate of the drive loop in Hz
    pub drive_loop_hz: f64,

    /// Number of loops to run before stopping, runs until stopped if not given
    #[serde(default)]
    pub max_loops: Option<u64>,

    /// Pilot PID gains
    pub pid_p: f64,
    pub pid_i: f64,
    pub pid_d: f64,

    /// Amount the derivative gain changes by when tuned with the buttons
    #[serde(default = "default_pid_d_step")]
    pub pid_d_step: f64,

    /// Throttle demand used while the pilot drives
    pub pid_throttle: f64,

    /// Either 1 or -1, the sign relating a positive PID output to the steering demand
    #[serde(default = "default_steering_sign")]
    pub steering_sign: f64,

    /// Steering angle at full operator steering input
    #[serde(default = "default_max_steer_deg")]
    pub max_steer_deg: f64,

    /// Minimum distance between recorded path points in meters
    pub path_min_dist_m: f64,

    /// File the recorded path is loaded from and saved to
    pub path_file: PathBuf,

    /// Localise with the remote odometry server rather than dead reckoning
    #[serde(default)]
    pub use_remote_odom: bool,

    /// How to launch the remote odometry server, if it should be launched
    #[serde(default)]
    pub odom_server: Option<OdomServerParams>,

    pub buttons: ButtonParams,

    #[serde(default)]
    pub initial: InitialParams,
}

/// Buttons bound to the operator actions
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonParams {
    pub reset_origin: String,
    pub save_path: String,
    pub inc_pid_d: String,
    pub dec_pid_d: String,
}

/// Values of the operator channels when no input device is attached
#[derive(Debug, Clone, Deserialize)]
pub struct InitialParams {
    #[serde(default)]
    pub mode: DriveMode,

    #[serde(default)]
    pub user_angle: f64,

    #[serde(default)]
    pub user_throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum DriveParamsError {
    #[error("wheelbase_m must be positive, got {0}")]
    InvalidWheelbase(f64),

    #[error("drive_loop_hz must be positive with a representable period, got {0}")]
    InvalidLoopRate(f64),

    #[error("steering_sign must be 1 or -1, got {0}")]
    InvalidSteeringSign(f64),

    #[error("max_steer_deg must be between 0 and 90 degrees, got {0}")]
    InvalidMaxSteer(f64),

    #[error("path_min_dist_m must not be negative, got {0}")]
    InvalidPathMinDist(f64),

    #[error("Parameter {0} must be finite")]
    NonFinite(&'static str),

    #[error("Button `{0}` is bound to more than one action")]
    DuplicateButton(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveParams {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), DriveParamsError> {
        let finite = [
            ("pid_p", self.pid_p),
            ("pid_i", self.pid_i),
            ("pid_d", self.pid_d),
            ("pid_d_step", self.pid_d_step),
            ("pid_throttle", self.pid_throttle),
            ("initial.user_angle", self.initial.user_angle),
            ("initial.user_throttle", self.initial.user_throttle),
        ];
        for &(name, val) in finite.iter() {
            if !val.is_finite() {
                return Err(DriveParamsError::NonFinite(name));
            }
        }

        if !self.wheelbase_m.is_finite() || self.wheelbase_m <= 0.0 {
            return Err(DriveParamsError::InvalidWheelbase(self.wheelbase_m));
        }
        if crate::vehicle::tick_period(self.drive_loop_hz).is_err() {
            return Err(DriveParamsError::InvalidLoopRate(self.drive_loop_hz));
        }
        if self.steering_sign != 1.0 && self.steering_sign != -1.0 {
            return Err(DriveParamsError::InvalidSteeringSign(self.steering_sign));
        }
        if !(self.max_steer_deg > 0.0 && self.max_steer_deg < 90.0) {
            return Err(DriveParamsError::InvalidMaxSteer(self.max_steer_deg));
        }
        if !self.path_min_dist_m.is_finite() || self.path_min_dist_m < 0.0 {
            return Err(DriveParamsError::InvalidPathMinDist(self.path_min_dist_m));
        }

        let buttons = self.buttons.all();
        for (i, b) in buttons.iter().enumerate() {
            if buttons[..i].contains(b) {
                return Err(DriveParamsError::DuplicateButton(b.to_string()));
            }
        }

        Ok(())
    }

    pub fn max_steer_rad(&self) -> f64 {
        self.max_steer_deg.to_radians()
    }
}

impl ButtonParams {
    fn all(&self) -> [&str; 4] {
        [
            self.reset_origin.as_str(),
            self.save_path.as_str(),
            self.inc_pid_d.as_str(),
            self.dec_pid_d.as_str(),
        ]
    }
}

impl Default for InitialParams {
    fn default() -> Self {
        Self {
            mode: DriveMode::User,
            user_angle: 0.0,
            user_throttle: 0.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_pid_d_step() -> f64 {
    0.5
}

fn default_steering_sign() -> f64 {
    -1.0
}

fn default_max_steer_deg() -> f64 {
    15.0
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS: &str = r#"
        wheelbase_m = 0.017
        drive_loop_hz = 20.0
        pid_p = -0.5
        pid_i = 0.0
        pid_d = -0.3
        pid_throttle = 0.2
        path_min_dist_m = 0.3
        path_file = "donkey_path.json"

        [buttons]
        reset_origin = "cross"
        save_path = "circle"
        inc_pid_d = "R2"
        dec_pid_d = "L2"
    "#;

    #[test]
    fn test_defaults() {
        let p: DriveParams = util::params::from_str(PARAMS).unwrap();
        p.validate().unwrap();

        assert_eq!(p.max_loops, None);
        assert_eq!(p.pid_d_step, 0.5);
        assert_eq!(p.steering_sign, -1.0);
        assert!(!p.use_remote_odom);
        assert!(p.odom_server.is_none());
        assert_eq!(p.initial.mode, DriveMode::User);
        assert!((p.max_steer_rad() - 0.2618).abs() < 1e-4);
    }

    #[test]
    fn test_full() {
        let src = format!(
            "{}\n{}",
            PARAMS.replace("pid_throttle = 0.2", "pid_throttle = 0.2\nmax_loops = 100\nuse_remote_odom = true"),
            r#"
            [odom_server]
            exec_path = "/opt/t265odom"
            config_path = "wheel_config.json"
            port = 5555

            [initial]
            mode = "local_angle"
            user_throttle = 0.1
            "#
        );
        let p: DriveParams = util::params::from_str(&src).unwrap();
        p.validate().unwrap();

        assert_eq!(p.max_loops, Some(100));
        assert!(p.use_remote_odom);
        assert_eq!(p.odom_server.unwrap().port, 5555);
        assert_eq!(p.initial.mode, DriveMode::LocalAngle);
        assert_eq!(p.initial.user_throttle, 0.1);
    }

    #[test]
    fn test_validation() {
        let base: DriveParams = util::params::from_str(PARAMS).unwrap();

        let mut p = base.clone();
        p.wheelbase_m = 0.0;
        assert_eq!(p.validate(), Err(DriveParamsError::InvalidWheelbase(0.0)));

        let mut p = base.clone();
        p.drive_loop_hz = -20.0;
        assert_eq!(p.validate(), Err(DriveParamsError::InvalidLoopRate(-20.0)));

        let mut p = base.clone();
        p.drive_loop_hz = 1e-20;
        assert_eq!(p.validate(), Err(DriveParamsError::InvalidLoopRate(1e-20)));

        let mut p = base.clone();
        p.steering_sign = 0.5;
        assert_eq!(p.validate(), Err(DriveParamsError::InvalidSteeringSign(0.5)));

        let mut p = base.clone();
        p.max_steer_deg = 90.0;
        assert_eq!(p.validate(), Err(DriveParamsError::InvalidMaxSteer(90.0)));

        let mut p = base.clone();
        p.pid_d = std::f64::INFINITY;
        assert_eq!(p.validate(), Err(DriveParamsError::NonFinite("pid_d")));

        let mut p = base.clone();
        p.buttons.dec_pid_d = "R2".into();
        assert_eq!(p.validate(), Err(DriveParamsError::DuplicateButton("R2".into())));
    }
}
