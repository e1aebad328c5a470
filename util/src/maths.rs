//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
///
/// The value is not clamped, values outside of the source range are extrapolated.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Return the euclidian distance between two points.
///
/// If the points do not have the same number of dimentions then `None` is returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float
{
    if point_0.len() != point_1.len() {
        return None;
    }

    let sum = point_0
        .iter()
        .zip(point_1.iter())
        .fold(T::zero(), |acc, (a, b)| acc + (*a - *b).powi(2));

    Some(sum.sqrt())
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance between a and b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t = tau::<T>();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when `lhs` is a very small
/// negative number, see [`wrap_2pi`] for a version which guarantees the half-open range.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the half-open range [0, 2pi).
pub fn wrap_2pi<T>(angle: T) -> T
where
    T: Float
{
    let tau_t = tau::<T>();
    let wrapped = rem_euclid(angle, tau_t);

    // Round-off can land exactly on 2pi
    if wrapped >= tau_t {
        T::zero()
    }
    else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn tau<T: Float>() -> T {
    T::from(std::f64::consts::TAU).unwrap_or_else(T::nan)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TAU: f64 = std::f64::consts::TAU;
    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_get_ang_dist_2pi() {
        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
    }

    #[test]
    fn test_wrap_2pi() {
        assert_eq!(wrap_2pi(0f64), 0f64);
        assert_eq!(wrap_2pi(TAU), 0f64);
        assert!((wrap_2pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_2pi(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_2pi(-0.5) - (TAU - 0.5)).abs() < 1e-12);

        let tiny = wrap_2pi(-1e-20f64);
        assert!(tiny >= 0.0 && tiny < TAU);
    }

    #[test]
    fn test_lin_map() {
        // Full steering input onto 15 degrees
        let deg = lin_map((-1f64, 1f64), (-15f64, 15f64), 1.0);
        assert!((deg - 15.0).abs() < 1e-12);
        assert_eq!(lin_map((-1f64, 1f64), (-15f64, 15f64), 0.0), 0.0);
        assert!((lin_map((-1f64, 1f64), (-15f64, 15f64), -0.5) + 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0f64, 0f64], &[3f64, 4f64]), Some(5f64));
        assert_eq!(norm(&[0f64], &[3f64, 4f64]), None);
    }
}
