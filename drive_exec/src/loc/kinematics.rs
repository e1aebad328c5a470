//! # Bicycle model kinematics
//!
//! Dead reckoning for a car-like vehicle. Each update integrates the distance travelled by the
//! wheels with the current steering angle. If the heading change over the step is large enough the
//! vehicle is moved along the arc of its turning circle, otherwise it is moved in a straight line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use util::maths::wrap_2pi;

use super::{LocError, Pose2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Heading change in radians below which a step is integrated as a straight line.
pub const STRAIGHT_LINE_THRESHOLD_RAD: f64 = 0.001;

/// Steering angles whose cosine is closer to zero than this have no usable turn radius.
const SINGULARITY_COS_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CarKinematics {
    /// Distance between the front and rear axles
    wheelbase_m: f64,

    pose: Pose2,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CarKinematics {
    pub fn new(pose: Pose2, wheelbase_m: f64) -> Result<Self, LocError> {
        if !wheelbase_m.is_finite() || wheelbase_m <= 0.0 {
            return Err(LocError::InvalidWheelbase(wheelbase_m));
        }

        Ok(Self { wheelbase_m, pose })
    }

    pub fn pose(&self) -> Pose2 {
        self.pose
    }

    /// Move the vehicle by `dist_m` along the path given by `steer_rad`, returning the new
    /// `(x, y)` position.
    ///
    /// On error the pose is left unchanged.
    pub fn update(&mut self, dist_m: f64, steer_rad: f64) -> Result<(f64, f64), LocError> {
        if !dist_m.is_finite() || !steer_rad.is_finite() {
            return Err(LocError::NonFiniteInput { dist_m, steer_rad });
        }
        if steer_rad.cos().abs() < SINGULARITY_COS_EPSILON {
            return Err(LocError::SteeringSingularity(steer_rad));
        }

        let Pose2 { x, y, heading_rad: theta } = self.pose;
        let l = self.wheelbase_m;

        // Heading change over this step
        let mut beta = dist_m / l * steer_rad.tan();

        if beta.abs() > STRAIGHT_LINE_THRESHOLD_RAD {
            // Rotate about the centre of the turning circle
            let radius = l / steer_rad.tan();
            beta = dist_m / radius;

            let centre_x = x - radius * theta.sin();
            let centre_y = y + radius * theta.cos();

            self.pose.x = centre_x + radius * (theta + beta).sin();
            self.pose.y = centre_y - radius * (theta + beta).cos();
        } else {
            self.pose.x = x + dist_m * theta.cos();
            self.pose.y = y + dist_m * theta.sin();
        }

        self.pose.heading_rad = wrap_2pi(theta + beta);

        trace!(
            "dist: {:.4} m, steer: {:.4} rad -> {:?}",
            dist_m, steer_rad, self.pose
        );

        Ok((self.pose.x, self.pose.y))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};
    use util::maths::get_ang_dist_2pi;

    #[test]
    fn test_invalid_wheelbase() {
        assert_eq!(
            CarKinematics::new(Pose2::default(), 0.0).unwrap_err(),
            LocError::InvalidWheelbase(0.0)
        );
        assert!(CarKinematics::new(Pose2::default(), -1.0).is_err());
        assert!(CarKinematics::new(Pose2::default(), std::f64::NAN).is_err());
    }

    #[test]
    fn test_straight_line() {
        let mut kine = CarKinematics::new(Pose2::default(), 0.017).unwrap();

        // Single step from the origin
        assert_eq!(kine.update(0.1, 0.0).unwrap(), (0.1, 0.0));
        assert_eq!(kine.pose().heading_rad, 0.0);

        // Repeated steps along a rotated heading
        let mut kine = CarKinematics::new(Pose2::new(1.0, 2.0, FRAC_PI_2), 0.5).unwrap();
        for _ in 0..10 {
            kine.update(0.25, 0.0).unwrap();
        }
        let pose = kine.pose();
        assert_abs_diff_eq!(pose.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.y, 4.5, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.heading_rad, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_single_arc() {
        let l = 0.017;
        let steer = 0.2618;
        let mut kine = CarKinematics::new(Pose2::default(), l).unwrap();

        let (x, y) = kine.update(0.1, steer).unwrap();

        let radius = l / steer.tan();
        let beta = 0.1 / radius;
        assert_abs_diff_eq!(radius, 0.0634, epsilon = 1e-3);
        assert_abs_diff_eq!(beta, 1.576, epsilon = 1e-3);
        assert_abs_diff_eq!(x, radius * beta.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(y, radius * (1.0 - beta.cos()), epsilon = 1e-12);
        assert_abs_diff_eq!(kine.pose().heading_rad, beta, epsilon = 1e-12);
    }

    #[test]
    fn test_small_heading_change_is_straight() {
        // Heading change of 0.1 / 1.0 * tan(0.005) ~= 0.0005 rad is under the threshold
        let mut kine = CarKinematics::new(Pose2::default(), 1.0).unwrap();
        let (x, y) = kine.update(0.1, 0.005).unwrap();

        assert_eq!((x, y), (0.1, 0.0));
        assert_abs_diff_eq!(kine.pose().heading_rad, 0.1 * 0.005f64.tan(), epsilon = 1e-15);
    }

    #[test]
    fn test_full_circle_closure() {
        let l = 1.0;
        let steer = 0.3;
        let radius = l / f64::tan(steer);
        let steps = 1000;
        let dist = TAU * radius / steps as f64;

        let mut kine = CarKinematics::new(Pose2::default(), l).unwrap();

        let mut max_y: f64 = 0.0;
        for _ in 0..steps {
            let (_, y) = kine.update(dist, steer).unwrap();
            max_y = max_y.max(y);

            let h = kine.pose().heading_rad;
            assert!(h >= 0.0 && h < TAU);
        }

        let pose = kine.pose();
        assert_abs_diff_eq!(pose.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pose.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(get_ang_dist_2pi(pose.heading_rad, 0.0), 0.0, epsilon = 1e-6);

        // Positive steering turns left, reaching the far side of the circle
        assert_abs_diff_eq!(max_y, 2.0 * radius, epsilon = 1e-3);
    }

    #[test]
    fn test_reverse_and_right_turn() {
        let mut kine = CarKinematics::new(Pose2::default(), 1.0).unwrap();

        // Turning right wraps the heading up towards 2pi
        kine.update(0.5, -0.3).unwrap();
        let h = kine.pose().heading_rad;
        assert!(h > PI && h < TAU);
        assert!(kine.pose().y < 0.0);

        // Reversing the same step returns to the start
        kine.update(-0.5, -0.3).unwrap();
        let pose = kine.pose();
        assert_abs_diff_eq!(pose.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(get_ang_dist_2pi(pose.heading_rad, 0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singularity() {
        let mut kine = CarKinematics::new(Pose2::new(1.0, 1.0, 0.5), 0.017).unwrap();

        assert_eq!(
            kine.update(0.1, FRAC_PI_2),
            Err(LocError::SteeringSingularity(FRAC_PI_2))
        );
        assert!(matches!(
            kine.update(std::f64::NAN, 0.0),
            Err(LocError::NonFiniteInput { .. })
        ));

        // Pose untouched
        assert_eq!(kine.pose(), Pose2::new(1.0, 1.0, 0.5));
    }
}
