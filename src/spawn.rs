//! Progressive spawn orchestration.
//!
//! Spawn requests accumulate as per-type pending counts in a [`SpawnQueue`].
//! Each frame [`SpawnQueue::drain`] places at most `max_spawn_per_frame` of
//! them: for every unit it samples up to `max_attempts` candidates, rejects
//! those too close to the player, and projects the rest onto the navmesh or
//! the ground. Units that never find a spot stay pending for the next frame.
//!
//! Ground queries go through [`GroundProjector`], so the host can back them
//! with its own navigation and physics. Each projection costs one unit of the
//! per-frame raycast budget; once that budget runs out the pass ends.

use crate::components::TypeIndex;
use crate::config::{SpawnConfig, SwarmConfig};
use crate::error::SwarmError;
use crate::math::Float3;
use crate::visibility::CameraView;
use crate::world::SwarmWorld;
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Height above the candidate where the downward ground trace starts.
pub const TRACE_UP: f32 = 2000.0;
/// Depth below the candidate where the downward ground trace ends.
pub const TRACE_DOWN: f32 = 5000.0;
/// Lift applied to a ground trace hit so agents start above the surface.
pub const GROUND_CLEARANCE: f32 = 5.0;

/// Rejection-sampling tries for a point in the unit disk.
const DISK_TRIES: usize = 8;

/// Host-side navigation and collision queries used to place spawns.
pub trait GroundProjector: Send + Sync {
    /// Nearest navigable point to `point`, if any.
    fn project_to_navmesh(&self, _point: Float3) -> Option<Float3> {
        None
    }

    /// First ground hit on the segment from `start` down to `end`.
    fn trace_ground(&self, start: Float3, end: Float3) -> Option<Float3>;
}

/// Infinite horizontal ground plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundProjector for FlatGround {
    fn trace_ground(&self, start: Float3, end: Float3) -> Option<Float3> {
        let (hi, lo) = if start.z >= end.z {
            (start.z, end.z)
        } else {
            (end.z, start.z)
        };
        (lo..=hi)
            .contains(&self.height)
            .then(|| Float3::new(start.x, start.y, self.height))
    }
}

/// Project onto the navmesh when enabled, otherwise (or on a navmesh miss)
/// trace down to the ground.
pub fn project_to_navmesh_or_ground(
    ground: &dyn GroundProjector,
    point: Float3,
    use_navmesh: bool,
) -> Option<Float3> {
    if use_navmesh {
        if let Some(p) = ground.project_to_navmesh(point) {
            tracing::trace!(x = p.x, y = p.y, z = p.z, "navmesh projection ok");
            return Some(p);
        }
    }
    let start = point + Float3::new(0.0, 0.0, TRACE_UP);
    let end = point - Float3::new(0.0, 0.0, TRACE_DOWN);
    match ground.trace_ground(start, end) {
        Some(hit) => Some(hit + Float3::new(0.0, 0.0, GROUND_CLEARANCE)),
        None => {
            tracing::trace!(x = point.x, y = point.y, z = point.z, "ground trace missed");
            None
        }
    }
}

/// Orthonormal camera frame: `(forward, right, up)`.
///
/// Right is horizontal; a camera looking straight up or down falls back to +Y.
pub fn camera_basis(forward: Float3) -> (Float3, Float3, Float3) {
    let mut fwd = forward.normalized_or_zero();
    if fwd == Float3::ZERO {
        fwd = Float3::new(1.0, 0.0, 0.0);
    }
    let mut right = Float3::UP.cross(fwd).normalized_or_zero();
    if right == Float3::ZERO {
        right = Float3::new(0.0, 1.0, 0.0);
    }
    let up = fwd.cross(right).normalized_or_zero();
    (fwd, right, up)
}

/// Uniform sample in `[lo, hi]`, tolerant of swapped or equal bounds.
fn uniform(rng: &mut impl Rng, a: f32, b: f32) -> f32 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    rng.gen_range(lo..=hi)
}

/// Rejection-sample a point in the unit disk; zero if every try misses.
pub fn random_in_unit_disk(rng: &mut impl Rng) -> (f32, f32) {
    for _ in 0..DISK_TRIES {
        let x: f32 = rng.gen_range(-1.0..=1.0);
        let y: f32 = rng.gen_range(-1.0..=1.0);
        if x * x + y * y <= 1.0 {
            return (x, y);
        }
    }
    (0.0, 0.0)
}

/// Point inside the view cone: along forward at `[near, far]`, offset in the
/// camera's right/up plane by up to `radius`.
pub fn sample_in_view(rng: &mut impl Rng, camera: &CameraView, near: f32, far: f32, radius: f32) -> Float3 {
    let (fwd, right, up) = camera_basis(camera.forward);
    let dist = uniform(rng, near, far);
    let (dx, dy) = random_in_unit_disk(rng);
    camera.position + fwd * dist + right * (dx * radius) + up * (dy * radius)
}

/// Point behind the camera, offset sideways and vertically.
pub fn sample_out_of_view(rng: &mut impl Rng, camera: &CameraView, near: f32, far: f32, radius: f32) -> Float3 {
    let (fwd, right, _) = camera_basis(camera.forward);
    let dist = uniform(rng, near, far);
    let (dx, dy) = random_in_unit_disk(rng);
    camera.position - fwd * dist + right * (dx * radius) + Float3::UP * (dy * radius)
}

/// Point on a horizontal ring `[near, far]` around `center`.
pub fn sample_ring(rng: &mut impl Rng, center: Float3, near: f32, far: f32) -> Float3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let dist = uniform(rng, near, far);
    center + Float3::new(angle.cos() * dist, angle.sin() * dist, 0.0)
}

/// Outcome of one spawn pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnReport {
    pub spawned: usize,
    /// Candidates dropped for being inside the player's exclusion radius.
    pub rejected_too_close: usize,
    pub projection_failures: usize,
    pub rays_used: usize,
    /// Pending units left across all types after the pass.
    pub pending_total: usize,
    /// The pass ended early because the raycast budget ran out.
    pub ray_budget_exhausted: bool,
    /// The pass ended early because `max_active` or the world cap was reached.
    pub capped: bool,
    /// Types skipped because they already have `max_count` agents alive.
    pub types_at_max_count: usize,
}

/// Pending spawn counts per type plus the sampling RNG.
#[derive(Resource, Debug, Clone)]
pub struct SpawnQueue {
    pending: Vec<usize>,
    force_out_of_view: Vec<bool>,
    max_count: Vec<usize>,
    rng: StdRng,
}

impl SpawnQueue {
    pub fn new(type_count: usize, seed: u64) -> Self {
        Self {
            pending: vec![0; type_count],
            force_out_of_view: vec![false; type_count],
            max_count: vec![usize::MAX; type_count],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &SwarmConfig) -> Self {
        let mut queue = Self::new(config.type_count(), config.seed);
        for (t, ty) in config.enemy_types.iter().enumerate() {
            queue.force_out_of_view[t] = ty.force_spawn_out_of_view;
            queue.max_count[t] = ty.max_count as usize;
        }
        queue
    }

    /// Mark a type as spawning behind the camera.
    pub fn set_force_out_of_view(&mut self, type_index: TypeIndex, force: bool) -> Result<(), SwarmError> {
        let count = self.pending.len();
        let flag = self
            .force_out_of_view
            .get_mut(type_index)
            .ok_or(SwarmError::InvalidArchetype { index: type_index, count })?;
        *flag = force;
        Ok(())
    }

    /// Limit how many agents of a type may be alive at once.
    pub fn set_max_count(&mut self, type_index: TypeIndex, max_count: usize) -> Result<(), SwarmError> {
        let count = self.pending.len();
        let slot = self
            .max_count
            .get_mut(type_index)
            .ok_or(SwarmError::InvalidArchetype { index: type_index, count })?;
        *slot = max_count;
        Ok(())
    }

    pub fn max_count(&self, type_index: TypeIndex) -> usize {
        self.max_count.get(type_index).copied().unwrap_or(0)
    }

    /// Add `count` units of a type to the queue.
    pub fn enqueue(&mut self, type_index: TypeIndex, count: usize) -> Result<(), SwarmError> {
        let len = self.pending.len();
        let pending = self
            .pending
            .get_mut(type_index)
            .ok_or(SwarmError::InvalidArchetype { index: type_index, count: len })?;
        *pending = pending.saturating_add(count);
        Ok(())
    }

    /// Queue `count` units of every type.
    pub fn enqueue_all(&mut self, count: usize) {
        for pending in &mut self.pending {
            *pending = pending.saturating_add(count);
        }
    }

    /// Drop every pending unit.
    pub fn cancel_all(&mut self) {
        self.pending.iter_mut().for_each(|p| *p = 0);
    }

    pub fn pending(&self, type_index: TypeIndex) -> usize {
        self.pending.get(type_index).copied().unwrap_or(0)
    }

    pub fn pending_per_type(&self) -> &[usize] {
        &self.pending
    }

    pub fn pending_total(&self) -> usize {
        self.pending.iter().sum()
    }

    pub fn type_count(&self) -> usize {
        self.pending.len()
    }

    fn sample(&mut self, type_index: TypeIndex, camera: &CameraView, player: Float3, config: &SpawnConfig) -> Float3 {
        let force_out = self.force_out_of_view.get(type_index).copied().unwrap_or(false);
        let rng = &mut self.rng;
        if force_out {
            sample_out_of_view(rng, camera, config.near, config.far, config.spawn_radius)
        } else if config.spawn_in_view_only {
            sample_in_view(rng, camera, config.near, config.far, config.spawn_radius)
        } else {
            sample_ring(rng, player, config.near, config.far)
        }
    }

    /// Run one budgeted spawn pass against `world`.
    pub fn drain(
        &mut self,
        world: &mut SwarmWorld,
        camera: &CameraView,
        player: Float3,
        config: &SpawnConfig,
        ground: &dyn GroundProjector,
    ) -> SpawnReport {
        let _span = tracing::info_span!("swarm_spawn", pending = self.pending_total()).entered();
        let mut report = SpawnReport::default();
        let mut budget = config.max_spawn_per_frame;
        let mut rays = config.max_raycast_per_frame;
        let min_dist_sq = config.min_distance_from_player * config.min_distance_from_player;
        let extent = world.params().world_extent;

        'types: for t in 0..self.pending.len() {
            if budget == 0 {
                break;
            }
            if self.pending[t] == 0 {
                continue;
            }
            let type_cap = self.max_count[t];
            let alive_of_type = world.alive_of_type(t);
            if alive_of_type >= type_cap {
                report.types_at_max_count += 1;
                tracing::trace!(type_index = t, max_count = type_cap, "type at max count, left pending");
                continue;
            }
            let to_spawn = self.pending[t].min(budget).min(type_cap - alive_of_type);
            for _ in 0..to_spawn {
                if world.num_alive() >= config.max_active {
                    report.capped = true;
                    break 'types;
                }
                for _ in 0..config.max_attempts.max(1) {
                    let mut candidate = self.sample(t, camera, player, config);
                    if extent > 0.0 {
                        candidate.x = candidate.x.clamp(-extent, extent);
                        candidate.y = candidate.y.clamp(-extent, extent);
                    }
                    if candidate.distance_squared(player) < min_dist_sq {
                        report.rejected_too_close += 1;
                        continue;
                    }
                    if rays == 0 {
                        report.ray_budget_exhausted = true;
                        break 'types;
                    }
                    rays -= 1;
                    report.rays_used += 1;
                    let Some(point) =
                        project_to_navmesh_or_ground(ground, candidate, config.use_navmesh_projection)
                    else {
                        report.projection_failures += 1;
                        continue;
                    };
                    if world.spawn(t, point).is_none() {
                        report.capped = true;
                        break 'types;
                    }
                    self.pending[t] -= 1;
                    report.spawned += 1;
                    break;
                }
            }
            budget -= to_spawn;
        }

        report.pending_total = self.pending_total();
        tracing::debug!(
            spawned = report.spawned,
            rejected = report.rejected_too_close,
            failures = report.projection_failures,
            rays = report.rays_used,
            pending = report.pending_total,
            "spawn pass"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EnemyType;
    use crate::config::{EnemyTypeConfig, SwarmParams};

    struct NoGround;

    impl GroundProjector for NoGround {
        fn trace_ground(&self, _start: Float3, _end: Float3) -> Option<Float3> {
            None
        }
    }

    struct Navmesh;

    impl GroundProjector for Navmesh {
        fn project_to_navmesh(&self, point: Float3) -> Option<Float3> {
            Some(Float3::new(point.x, point.y, -7.0))
        }

        fn trace_ground(&self, _start: Float3, _end: Float3) -> Option<Float3> {
            None
        }
    }

    fn world() -> SwarmWorld {
        SwarmWorld::new(SwarmParams::default(), vec![EnemyType::default(); 2], 0, 0.0, 0.0)
    }

    fn far_ring() -> SpawnConfig {
        SpawnConfig {
            near: 2000.0,
            far: 2600.0,
            spawn_radius: 500.0,
            min_distance_from_player: 1800.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_ground_projection_adds_clearance() {
        let p = project_to_navmesh_or_ground(&FlatGround::new(10.0), Float3::new(3.0, 4.0, 100.0), true);
        assert_eq!(p, Some(Float3::new(3.0, 4.0, 15.0)));
        let below = project_to_navmesh_or_ground(&FlatGround::new(10.0), Float3::new(0.0, 0.0, 9000.0), false);
        assert_eq!(below, None);
    }

    #[test]
    fn test_navmesh_takes_priority_when_enabled() {
        let p = Float3::new(1.0, 2.0, 3.0);
        assert_eq!(project_to_navmesh_or_ground(&Navmesh, p, true), Some(Float3::new(1.0, 2.0, -7.0)));
        assert_eq!(project_to_navmesh_or_ground(&Navmesh, p, false), None);
    }

    #[test]
    fn test_camera_basis_is_orthonormal() {
        let (f, r, u) = camera_basis(Float3::new(1.0, 0.0, 0.0));
        assert_eq!(r, Float3::new(0.0, 1.0, 0.0));
        assert_eq!(u, Float3::new(0.0, 0.0, 1.0));
        assert_eq!(f, Float3::new(1.0, 0.0, 0.0));

        let (_, r, u) = camera_basis(Float3::new(0.0, 0.0, -1.0));
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_in_view_samples_stay_in_front() {
        let mut rng = StdRng::seed_from_u64(7);
        let cam = CameraView::default();
        for _ in 0..200 {
            let p = sample_in_view(&mut rng, &cam, 800.0, 2600.0, 500.0);
            assert!(p.x >= 800.0 && p.x <= 2600.0);
            assert!(p.y.abs() <= 500.0 + 1e-3);
        }
    }

    #[test]
    fn test_out_of_view_samples_stay_behind() {
        let mut rng = StdRng::seed_from_u64(7);
        let cam = CameraView::default();
        for _ in 0..200 {
            let p = sample_out_of_view(&mut rng, &cam, 800.0, 2600.0, 500.0);
            assert!(p.x <= -800.0);
        }
    }

    #[test]
    fn test_enqueue_rejects_unknown_type() {
        let mut queue = SpawnQueue::new(2, 1);
        assert!(queue.enqueue(1, 5).is_ok());
        let err = queue.enqueue(2, 5).unwrap_err();
        assert!(matches!(err, SwarmError::InvalidArchetype { index: 2, count: 2 }));
        assert_eq!(queue.pending_total(), 5);
    }

    #[test]
    fn test_budget_limits_each_pass() {
        let mut w = world();
        let mut queue = SpawnQueue::new(2, 42);
        queue.enqueue(0, 30).unwrap();
        queue.enqueue(1, 30).unwrap();
        let config = SpawnConfig {
            max_spawn_per_frame: 40,
            ..far_ring()
        };
        let report = queue.drain(&mut w, &CameraView::default(), Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(report.spawned, 40);
        assert_eq!(queue.pending(0), 0);
        assert_eq!(queue.pending(1), 20);
        assert_eq!(report.pending_total, 20);
        assert_eq!(w.alive_of_type(1), 10);
    }

    #[test]
    fn test_failed_projection_keeps_pending() {
        let mut w = world();
        let mut queue = SpawnQueue::new(2, 42);
        queue.enqueue(0, 100).unwrap();
        let config = SpawnConfig {
            max_spawn_per_frame: 50,
            max_raycast_per_frame: 256,
            ..far_ring()
        };
        let report = queue.drain(&mut w, &CameraView::default(), Float3::ZERO, &config, &NoGround);
        assert_eq!(report.spawned, 0);
        assert_eq!(report.projection_failures, 256);
        assert!(report.ray_budget_exhausted);
        assert_eq!(queue.pending(0), 100);
        assert!(w.is_empty());
    }

    #[test]
    fn test_too_close_candidates_rejected() {
        let mut w = world();
        let mut queue = SpawnQueue::new(2, 42);
        queue.enqueue(0, 10).unwrap();
        let config = SpawnConfig {
            near: 100.0,
            far: 200.0,
            spawn_radius: 10.0,
            min_distance_from_player: 5000.0,
            ..Default::default()
        };
        let report = queue.drain(&mut w, &CameraView::default(), Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(report.spawned, 0);
        assert_eq!(report.rays_used, 0);
        assert_eq!(report.rejected_too_close, 10 * config.max_attempts);
        assert_eq!(queue.pending(0), 10);
    }

    #[test]
    fn test_max_active_stops_pass() {
        let mut w = world();
        let mut queue = SpawnQueue::new(2, 42);
        queue.enqueue(0, 50).unwrap();
        let config = SpawnConfig {
            max_active: 5,
            ..far_ring()
        };
        let report = queue.drain(&mut w, &CameraView::default(), Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(report.spawned, 5);
        assert!(report.capped);
        assert_eq!(queue.pending(0), 45);
    }

    #[test]
    fn test_max_count_caps_type_and_spares_budget() {
        let mut w = world();
        let mut queue = SpawnQueue::new(2, 42);
        queue.set_max_count(0, 8).unwrap();
        assert!(queue.set_max_count(2, 8).is_err());
        queue.enqueue(0, 30).unwrap();
        queue.enqueue(1, 30).unwrap();
        let config = SpawnConfig {
            max_spawn_per_frame: 40,
            ..far_ring()
        };
        let camera = CameraView::default();

        let report = queue.drain(&mut w, &camera, Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(w.alive_of_type(0), 8);
        assert_eq!(w.alive_of_type(1), 30);
        assert_eq!(report.spawned, 38);
        assert_eq!(queue.pending(0), 22);

        let report = queue.drain(&mut w, &camera, Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(report.spawned, 0);
        assert_eq!(report.types_at_max_count, 1);

        w.kill(0);
        let report = queue.drain(&mut w, &camera, Float3::ZERO, &config, &FlatGround::default());
        assert_eq!(report.spawned, 1);
        assert_eq!(w.alive_of_type(0), 8);
        assert_eq!(queue.pending(0), 21);
    }

    #[test]
    fn test_from_config_reads_type_limits() {
        let config = SwarmConfig {
            enemy_types: vec![
                EnemyTypeConfig { max_count: 3, ..Default::default() },
                EnemyTypeConfig { force_spawn_out_of_view: true, ..Default::default() },
            ],
            ..Default::default()
        };
        let queue = SpawnQueue::from_config(&config);
        assert_eq!(queue.max_count(0), 3);
        assert_eq!(queue.max_count(1), 10_000);
    }

    #[test]
    fn test_same_seed_same_positions() {
        let run = || {
            let mut w = world();
            let mut queue = SpawnQueue::new(2, 99);
            queue.enqueue(0, 20).unwrap();
            queue.drain(&mut w, &CameraView::default(), Float3::ZERO, &far_ring(), &FlatGround::default());
            w.px().to_vec()
        };
        assert_eq!(run(), run());
    }
}
