//! Visibility culling over the swarm arrays.
//!
//! Produces, for every enemy type, the ascending list of alive agent indices
//! that pass the enabled tests:
//!
//! - distance: `|p - camera|^2 <= max_distance^2`
//! - frustum: `dot(normalize(p - camera), forward) >= cos(fov / 2)`
//!
//! The index space is split into contiguous chunks, one per worker. Each chunk
//! builds private per-type lists; the chunk results are then concatenated in
//! chunk order, so the output is identical with or without the `parallel`
//! feature. Lists are rebuilt from scratch on every call.

use crate::components::{AgentIndex, TypeIndex};
use crate::config::VisibilityConfig;
use crate::math::Float3;
use crate::systems::{chunk_ranges, worker_count};
use crate::world::SwarmWorld;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Camera pose used for culling and in-view spawning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub position: Float3,
    /// View direction. Need not be normalized.
    pub forward: Float3,
    /// Full horizontal field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Float3::ZERO,
            forward: Float3::new(1.0, 0.0, 0.0),
            fov_degrees: 90.0,
        }
    }
}

impl CameraView {
    pub fn new(position: Float3, forward: Float3, fov_degrees: f32) -> Self {
        Self {
            position,
            forward,
            fov_degrees,
        }
    }

    /// Cosine of half the field of view, clamped to a sane angle range.
    pub fn cos_half_fov(&self) -> f32 {
        let fov = if self.fov_degrees.is_finite() {
            self.fov_degrees.clamp(0.0, 360.0)
        } else {
            90.0
        };
        (fov.to_radians() * 0.5).cos()
    }
}

/// Per-frame test parameters, resolved once before fanning out.
#[derive(Clone, Copy)]
struct CullTest {
    origin: Float3,
    forward: Float3,
    cos_half_fov: f32,
    max_distance_sq: f32,
    frustum: bool,
    distance: bool,
}

impl CullTest {
    fn new(camera: &CameraView, config: &VisibilityConfig) -> Self {
        let forward = camera.forward.normalized_or_zero();
        let frustum = config.frustum_cull && forward != Float3::ZERO;
        if config.frustum_cull && !frustum {
            tracing::trace!("degenerate camera forward; frustum test skipped");
        }
        let distance = config.distance_cull && config.max_distance > 0.0;
        Self {
            origin: camera.position,
            forward,
            cos_half_fov: camera.cos_half_fov(),
            max_distance_sq: config.max_distance * config.max_distance,
            frustum,
            distance,
        }
    }

    #[inline]
    fn passes(&self, p: Float3) -> bool {
        let to = p - self.origin;
        if self.distance && to.len2() > self.max_distance_sq {
            return false;
        }
        if self.frustum && to.normalized_or_zero().dot(self.forward) < self.cos_half_fov {
            return false;
        }
        true
    }
}

fn cull_range(world: &SwarmWorld, test: &CullTest, type_count: usize, range: Range<usize>) -> Vec<Vec<AgentIndex>> {
    let mut lists = vec![Vec::new(); type_count];
    for i in range {
        if !world.alive[i] {
            continue;
        }
        let t = world.types[i];
        if t >= type_count {
            continue;
        }
        if test.passes(Float3::new(world.px[i], world.py[i], world.pz[i])) {
            lists[t].push(i);
        }
    }
    lists
}

/// Visible agent indices grouped by type.
#[derive(Resource, Debug, Clone, Default)]
pub struct VisibilitySet {
    per_type: Vec<Vec<AgentIndex>>,
}

impl VisibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the visible lists from the current world state.
    pub fn compute(&mut self, world: &SwarmWorld, camera: &CameraView, config: &VisibilityConfig) {
        let _span = tracing::info_span!("swarm_visibility", agents = world.len()).entered();
        let type_count = world.archetypes.len();
        let test = CullTest::new(camera, config);

        let ranges = chunk_ranges(world.len(), worker_count());

        #[cfg(feature = "parallel")]
        let partials: Vec<Vec<Vec<AgentIndex>>> = ranges
            .into_par_iter()
            .map(|range| cull_range(world, &test, type_count, range))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let partials: Vec<Vec<Vec<AgentIndex>>> = ranges
            .into_iter()
            .map(|range| cull_range(world, &test, type_count, range))
            .collect();

        self.per_type.resize_with(type_count, Vec::new);
        for list in &mut self.per_type {
            list.clear();
        }
        for partial in partials {
            for (t, list) in partial.into_iter().enumerate() {
                self.per_type[t].extend(list);
            }
        }
    }

    /// Visible indices of one type, ascending.
    pub fn visible_of_type(&self, type_index: TypeIndex) -> &[AgentIndex] {
        self.per_type.get(type_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn per_type(&self) -> &[Vec<AgentIndex>] {
        &self.per_type
    }

    pub fn type_count(&self) -> usize {
        self.per_type.len()
    }

    /// Visible agents across all types.
    pub fn total(&self) -> usize {
        self.per_type.iter().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.per_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EnemyType;
    use crate::config::SwarmParams;

    fn world(points: &[(usize, Float3)]) -> SwarmWorld {
        let mut w = SwarmWorld::new(
            SwarmParams::default(),
            vec![EnemyType::default(), EnemyType::default()],
            0,
            0.0,
            0.0,
        );
        for &(t, p) in points {
            w.spawn(t, p);
        }
        w
    }

    #[test]
    fn test_cos_half_fov() {
        let cam = CameraView::default();
        assert!((cam.cos_half_fov() - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        let wide = CameraView::new(Float3::ZERO, Float3::new(1.0, 0.0, 0.0), 400.0);
        assert!((wide.cos_half_fov() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_groups_by_type_in_index_order() {
        let w = world(&[
            (1, Float3::new(100.0, 0.0, 0.0)),
            (0, Float3::new(200.0, 0.0, 0.0)),
            (1, Float3::new(300.0, 0.0, 0.0)),
            (0, Float3::new(-300.0, 0.0, 0.0)),
        ]);
        let mut vis = VisibilitySet::new();
        vis.compute(&w, &CameraView::default(), &VisibilityConfig::default());
        assert_eq!(vis.visible_of_type(0), &[1]);
        assert_eq!(vis.visible_of_type(1), &[0, 2]);
        assert_eq!(vis.total(), 3);
        assert!(vis.visible_of_type(7).is_empty());
    }

    #[test]
    fn test_culling_disabled_returns_all_alive() {
        let mut w = world(&[
            (0, Float3::new(-9000.0, 0.0, 0.0)),
            (0, Float3::new(9000.0, 0.0, 0.0)),
            (1, Float3::new(0.0, 9000.0, 0.0)),
        ]);
        w.kill(1);
        let config = VisibilityConfig {
            frustum_cull: false,
            distance_cull: false,
            ..Default::default()
        };
        let mut vis = VisibilitySet::new();
        vis.compute(&w, &CameraView::default(), &config);
        assert_eq!(vis.visible_of_type(0), &[0]);
        assert_eq!(vis.visible_of_type(1), &[2]);
    }

    #[test]
    fn test_recompute_discards_previous() {
        let w = world(&[(0, Float3::new(100.0, 0.0, 0.0))]);
        let mut vis = VisibilitySet::new();
        vis.compute(&w, &CameraView::default(), &VisibilityConfig::default());
        assert_eq!(vis.total(), 1);
        let behind = CameraView::new(Float3::ZERO, Float3::new(-1.0, 0.0, 0.0), 90.0);
        vis.compute(&w, &behind, &VisibilityConfig::default());
        assert_eq!(vis.total(), 0);
    }

    #[test]
    fn test_chunked_matches_single_pass() {
        let points: Vec<(usize, Float3)> = (0..500)
            .map(|i| {
                let a = i as f32 * 0.37;
                (i % 2, Float3::new(a.cos() * (i as f32 * 7.0), a.sin() * (i as f32 * 7.0), 0.0))
            })
            .collect();
        let w = world(&points);
        let cam = CameraView::default();
        let config = VisibilityConfig::default();
        let mut vis = VisibilitySet::new();
        vis.compute(&w, &cam, &config);

        let test = CullTest::new(&cam, &config);
        let single = cull_range(&w, &test, 2, 0..w.len());
        assert_eq!(vis.per_type(), single.as_slice());
    }
}
