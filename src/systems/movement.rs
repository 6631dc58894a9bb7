//! Movement - folds separation and steering into velocity and integrates.

use crate::math::Float3;
use crate::systems::steering::chase_acceleration;
use crate::world::SwarmWorld;

/// Scale `v` down to at most `cap` in length.
#[inline]
pub fn clamp_speed(v: Float3, cap: f32) -> Float3 {
    let cap = cap.max(0.0);
    let s2 = v.len2();
    if s2 > cap * cap {
        if cap == 0.0 {
            return Float3::ZERO;
        }
        return v * (cap / s2.sqrt());
    }
    v
}

/// Reflect one axis off the `[-extent, extent]` boundary.
#[inline]
pub fn bounce_axis(p: &mut f32, v: &mut f32, extent: f32) {
    if *p > extent {
        *p = extent;
        *v = -v.abs();
    } else if *p < -extent {
        *p = -extent;
        *v = v.abs();
    }
}

/// Scale the component of `v` along unit `normal` by `decay`.
#[inline]
pub fn damp_along(v: Float3, normal: Float3, decay: f32) -> Float3 {
    v - normal * (v.dot(normal) * (1.0 - decay))
}

/// Update velocity and position of every alive agent.
///
/// `separation` holds one push per slot from the gather phase.
pub fn integrate_agents(world: &mut SwarmWorld, separation: &[Float3], dt: f32) {
    let p = world.params;
    let decay = (-p.damping.max(0.0) * dt).exp();
    let push_gain = p.separation_stiffness.max(0.0) * dt;
    let contact_decay = (-p.contact_damping.max(0.0) * dt).exp();
    let target = world.target;

    for i in 0..world.alive.len() {
        if !world.alive[i] {
            continue;
        }
        let pos = Float3::new(world.px[i], world.py[i], world.pz[i]);
        let mut v = Float3::new(world.vx[i], world.vy[i], world.vz[i]) * decay;

        let push = separation.get(i).copied().unwrap_or(Float3::ZERO);
        v = damp_along(v, push.normalized_or_zero(), contact_decay);
        v += push * push_gain;
        if p.chase_target {
            v += chase_acceleration(pos, target, p.chase_accel, p.lock_z) * dt;
        }

        let cap = world
            .archetypes
            .get(world.types[i])
            .map(|t| t.speed_cap(p.max_speed))
            .unwrap_or(p.max_speed);
        v = clamp_speed(v, cap);

        let mut next = pos + v * dt;
        if p.lock_z {
            next.z = p.ground_z;
            v.z = 0.0;
        }
        if p.world_extent > 0.0 {
            bounce_axis(&mut next.x, &mut v.x, p.world_extent);
            bounce_axis(&mut next.y, &mut v.y, p.world_extent);
            if !p.lock_z {
                bounce_axis(&mut next.z, &mut v.z, p.world_extent);
            }
        }
        if !next.is_finite() || !v.is_finite() {
            next = pos;
            v = Float3::ZERO;
        }

        world.px[i] = next.x;
        world.py[i] = next.y;
        world.pz[i] = next.z;
        world.vx[i] = v.x;
        world.vy[i] = v.y;
        world.vz[i] = v.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed() {
        let v = clamp_speed(Float3::new(30.0, 40.0, 0.0), 10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
        assert!((v.x - 6.0).abs() < 1e-4);
        assert_eq!(clamp_speed(Float3::new(1.0, 0.0, 0.0), 10.0), Float3::new(1.0, 0.0, 0.0));
        assert_eq!(clamp_speed(Float3::new(1.0, 0.0, 0.0), 0.0), Float3::ZERO);
    }

    #[test]
    fn test_damp_along_only_touches_normal_component() {
        let v = damp_along(Float3::new(10.0, 4.0, 0.0), Float3::new(1.0, 0.0, 0.0), 0.25);
        assert!((v.x - 2.5).abs() < 1e-5);
        assert_eq!(v.y, 4.0);
        assert_eq!(damp_along(Float3::new(3.0, 0.0, 0.0), Float3::ZERO, 0.0), Float3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_bounce_axis_reflects_inward() {
        let (mut p, mut v) = (105.0, 10.0);
        bounce_axis(&mut p, &mut v, 100.0);
        assert_eq!(p, 100.0);
        assert_eq!(v, -10.0);

        let (mut p, mut v) = (-120.0, -3.0);
        bounce_axis(&mut p, &mut v, 100.0);
        assert_eq!(p, -100.0);
        assert_eq!(v, 3.0);

        let (mut p, mut v) = (50.0, 7.0);
        bounce_axis(&mut p, &mut v, 100.0);
        assert_eq!((p, v), (50.0, 7.0));
    }
}
