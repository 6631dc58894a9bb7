//! Separation - crowd avoidance between nearby agents.
//!
//! ## Gather Phase
//!
//! Each agent's push is computed independently from the grid snapshot built at
//! the start of the step, so the pass has no writes to shared state and can
//! be split across threads. Pairs are visited from both sides; the two halves
//! of a pair are not bit-identical under floating point, but each member moves
//! away from the other by its share of the overlap.
//!
//! Push magnitude is `(separation - distance) * share`, where `share` is the
//! neighbor's fraction of the combined radii. Agents at or beyond the
//! separation distance contribute nothing.

use crate::components::{AgentIndex, EnemyType};
use crate::math::{Float3, NORMALIZE_EPSILON_SQ};
use crate::spatial::SpatialGrid;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Read-only view of the state the gather phase needs.
pub struct SeparationInput<'a> {
    pub px: &'a [f32],
    pub py: &'a [f32],
    pub pz: &'a [f32],
    pub alive: &'a [bool],
    pub types: &'a [usize],
    pub archetypes: &'a [EnemyType],
    pub grid: &'a SpatialGrid,
    pub separation: f32,
}

impl SeparationInput<'_> {
    #[inline]
    fn position(&self, i: AgentIndex) -> Float3 {
        Float3::new(self.px[i], self.py[i], self.pz[i])
    }

    #[inline]
    fn radius(&self, i: AgentIndex) -> f32 {
        self.archetypes
            .get(self.types[i])
            .map(|t| t.radius.max(0.0))
            .unwrap_or(0.0)
    }
}

/// Overlap-resolving displacement for agent `i` (world units).
pub fn separation_push(input: &SeparationInput<'_>, i: AgentIndex) -> Float3 {
    if !input.alive.get(i).copied().unwrap_or(false) || !(input.separation > 0.0) {
        return Float3::ZERO;
    }
    let sep = input.separation;
    let sep2 = sep * sep;
    let pi = input.position(i);
    let ri = input.radius(i);
    let mut push = Float3::ZERO;

    input.grid.for_neighbors(pi, |j| {
        if j == i || !input.alive.get(j).copied().unwrap_or(false) {
            return;
        }
        let away = pi - input.position(j);
        let d2 = away.len2();
        if d2 >= sep2 {
            return;
        }
        let rj = input.radius(j);
        let share = if ri + rj > 0.0 { rj / (ri + rj) } else { 0.5 };

        if d2 > NORMALIZE_EPSILON_SQ {
            let d = d2.sqrt();
            push += away * ((sep - d) * share / d);
        } else {
            // Coincident pair: split along x by index order.
            let dir = if i < j { -1.0 } else { 1.0 };
            push += Float3::new(dir * sep * share, 0.0, 0.0);
        }
    });

    push
}

/// Compute the separation push for every slot into `out` (one entry per slot).
pub fn gather_separation(input: &SeparationInput<'_>, out: &mut Vec<Float3>) {
    let n = input.alive.len();

    #[cfg(feature = "parallel")]
    {
        (0..n)
            .into_par_iter()
            .map(|i| separation_push(input, i))
            .collect_into_vec(out);
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.clear();
        out.extend((0..n).map(|i| separation_push(input, i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(px: &[f32], alive: &[bool], radius: &[f32], sep: f32) -> Vec<Float3> {
        let n = px.len();
        let py = vec![0.0; n];
        let pz = vec![0.0; n];
        let archetypes: Vec<EnemyType> = radius
            .iter()
            .map(|&r| EnemyType::new(r, 600.0, 10.0, 5.0))
            .collect();
        let types: Vec<usize> = (0..n).collect();
        let mut grid = SpatialGrid::new(200.0);
        grid.build_where(px, &py, &pz, |i| alive[i]);
        let input = SeparationInput {
            px,
            py: &py,
            pz: &pz,
            alive,
            types: &types,
            archetypes: &archetypes,
            grid: &grid,
            separation: sep,
        };
        let mut out = Vec::new();
        gather_separation(&input, &mut out);
        out
    }

    #[test]
    fn test_equal_radii_split_overlap() {
        let out = run(&[0.0, 60.0], &[true, true], &[40.0, 40.0], 100.0);
        // Overlap of 40 split evenly, pointing away from each other.
        assert!((out[0].x + 20.0).abs() < 1e-4);
        assert!((out[1].x - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_beyond_separation_contributes_nothing() {
        let out = run(&[0.0, 100.0, 250.0], &[true, true, true], &[40.0; 3], 100.0);
        assert_eq!(out[0], Float3::ZERO);
        assert_eq!(out[2], Float3::ZERO);
    }

    #[test]
    fn test_larger_neighbor_pushes_harder() {
        let out = run(&[0.0, 50.0], &[true, true], &[10.0, 30.0], 100.0);
        assert!(out[0].x.abs() > out[1].x.abs());
        assert!((out[0].x.abs() + out[1].x.abs() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_dead_agents_ignored() {
        let out = run(&[0.0, 10.0], &[true, false], &[40.0, 40.0], 100.0);
        assert_eq!(out[0], Float3::ZERO);
        assert_eq!(out[1], Float3::ZERO);
    }

    #[test]
    fn test_coincident_agents_split_without_nan() {
        let out = run(&[5.0, 5.0], &[true, true], &[40.0, 40.0], 100.0);
        assert!(out[0].is_finite() && out[1].is_finite());
        assert!(out[0].x < 0.0);
        assert!(out[1].x > 0.0);
    }
}
