//! Chase steering toward the world target.

use crate::math::Float3;

/// Agents within this squared distance of the target stop steering.
pub const ARRIVE_DISTANCE_SQ: f32 = 1.0;

/// Acceleration toward `target` with magnitude `accel`.
///
/// With `lock_z` the vertical component is ignored so ground-locked agents
/// steer in the plane. Zero once the agent has arrived.
pub fn chase_acceleration(position: Float3, target: Float3, accel: f32, lock_z: bool) -> Float3 {
    let mut to = target - position;
    if lock_z {
        to.z = 0.0;
    }
    if to.len2() <= ARRIVE_DISTANCE_SQ {
        return Float3::ZERO;
    }
    to.normalized_or_zero() * accel.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_at_target_with_accel_magnitude() {
        let a = chase_acceleration(Float3::ZERO, Float3::new(0.0, 10.0, 0.0), 600.0, false);
        assert!((a.y - 600.0).abs() < 1e-3);
        assert!((a.length() - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_lock_z_ignores_height() {
        let a = chase_acceleration(Float3::ZERO, Float3::new(10.0, 0.0, 500.0), 100.0, true);
        assert_eq!(a.z, 0.0);
        assert!((a.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_arrived_is_zero() {
        let a = chase_acceleration(Float3::ZERO, Float3::new(0.5, 0.0, 0.0), 100.0, false);
        assert_eq!(a, Float3::ZERO);
        let directly_above = chase_acceleration(Float3::ZERO, Float3::new(0.0, 0.0, 50.0), 100.0, true);
        assert_eq!(directly_above, Float3::ZERO);
    }
}
