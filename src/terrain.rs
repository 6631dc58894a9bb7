//! Heightfield ground for spawn placement.
//!
//! A row-major grid of heights centered on the world origin. It answers the
//! downward ground trace used by the spawner, so hosts without their own
//! physics scene (tests, the demo, headless servers) still get terrain-aware
//! spawn heights.

use crate::error::SwarmError;
use crate::math::Float3;
use crate::spawn::GroundProjector;
use serde::{Deserialize, Serialize};

/// Grid-based terrain heightmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heightfield {
    /// Width of the grid in cells.
    pub width: usize,
    /// Depth of the grid in cells.
    pub depth: usize,
    /// Size of each cell in world units.
    pub cell_size: f32,
    /// World position of cell (0, 0).
    pub origin_x: f32,
    pub origin_y: f32,
    heights: Vec<f32>,
}

impl Heightfield {
    /// Flat heightfield at height zero, centered on the origin.
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width,
            depth,
            cell_size,
            origin_x: -(width as f32 * cell_size) / 2.0,
            origin_y: -(depth as f32 * cell_size) / 2.0,
            heights: vec![0.0; width * depth],
        }
    }

    /// Centered heightfield from explicit row-major heights.
    pub fn from_heights(width: usize, depth: usize, cell_size: f32, heights: Vec<f32>) -> Result<Self, SwarmError> {
        if heights.len() != width * depth {
            return Err(SwarmError::Config(format!(
                "heightfield expects {} samples, got {}",
                width * depth,
                heights.len()
            )));
        }
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(SwarmError::Config(format!(
                "heightfield cell_size must be positive, got {cell_size}"
            )));
        }
        let mut field = Self::new(width, depth, cell_size);
        field.heights = heights;
        Ok(field)
    }

    /// Fill every cell from a function of the cell's world-space center.
    pub fn fill_with(&mut self, mut f: impl FnMut(f32, f32) -> f32) {
        for gy in 0..self.depth {
            for gx in 0..self.width {
                let (x, y) = self.grid_to_world(gx, gy);
                self.heights[gy * self.width + gx] = f(x, y);
            }
        }
    }

    fn cell_index(&self, gx: usize, gy: usize) -> Option<usize> {
        (gx < self.width && gy < self.depth).then(|| gy * self.width + gx)
    }

    /// Grid cell containing a world position, or `None` outside the field.
    pub fn world_to_grid(&self, world_x: f32, world_y: f32) -> Option<(usize, usize)> {
        let gx = ((world_x - self.origin_x) / self.cell_size).floor();
        let gy = ((world_y - self.origin_y) / self.cell_size).floor();
        if !(gx >= 0.0 && gy >= 0.0) {
            return None;
        }
        let (gx, gy) = (gx as usize, gy as usize);
        self.cell_index(gx, gy).map(|_| (gx, gy))
    }

    /// World-space center of a cell.
    pub fn grid_to_world(&self, gx: usize, gy: usize) -> (f32, f32) {
        (
            self.origin_x + (gx as f32 + 0.5) * self.cell_size,
            self.origin_y + (gy as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn height_at(&self, world_x: f32, world_y: f32) -> Option<f32> {
        let (gx, gy) = self.world_to_grid(world_x, world_y)?;
        self.cell_index(gx, gy).map(|i| self.heights[i])
    }

    pub fn set_height(&mut self, gx: usize, gy: usize, height: f32) -> bool {
        match self.cell_index(gx, gy) {
            Some(i) => {
                self.heights[i] = height;
                true
            }
            None => false,
        }
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// `(min_x, min_y, max_x, max_y)` in world units.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width as f32 * self.cell_size,
            self.origin_y + self.depth as f32 * self.cell_size,
        )
    }
}

impl GroundProjector for Heightfield {
    fn trace_ground(&self, start: Float3, end: Float3) -> Option<Float3> {
        let h = self.height_at(start.x, start.y)?;
        let (hi, lo) = if start.z >= end.z {
            (start.z, end.z)
        } else {
            (end.z, start.z)
        };
        (lo..=hi).contains(&h).then(|| Float3::new(start.x, start.y, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_is_centered() {
        let field = Heightfield::new(100, 100, 2.0);
        assert_eq!(field.heights().len(), 10_000);
        assert_eq!(field.world_to_grid(0.0, 0.0), Some((50, 50)));
        assert_eq!(field.bounds(), (-100.0, -100.0, 100.0, 100.0));
        assert_eq!(field.world_to_grid(-101.0, 0.0), None);
        assert_eq!(field.world_to_grid(100.0, 0.0), None);
    }

    #[test]
    fn test_trace_hits_cell_height() {
        let mut field = Heightfield::new(10, 10, 100.0);
        assert!(field.set_height(5, 5, 250.0));
        let hit = field.trace_ground(Float3::new(10.0, 10.0, 1000.0), Float3::new(10.0, 10.0, -1000.0));
        assert_eq!(hit, Some(Float3::new(10.0, 10.0, 250.0)));
    }

    #[test]
    fn test_trace_misses_outside_or_out_of_span() {
        let field = Heightfield::new(10, 10, 100.0);
        let outside = field.trace_ground(Float3::new(5000.0, 0.0, 100.0), Float3::new(5000.0, 0.0, -100.0));
        assert_eq!(outside, None);
        let above = field.trace_ground(Float3::new(0.0, 0.0, 900.0), Float3::new(0.0, 0.0, 100.0));
        assert_eq!(above, None);
    }

    #[test]
    fn test_from_heights_validates_length() {
        assert!(Heightfield::from_heights(2, 2, 1.0, vec![0.0; 3]).is_err());
        let field = Heightfield::from_heights(2, 1, 1.0, vec![1.0, 2.0]).unwrap();
        assert_eq!(field.height_at(0.5, 0.0), Some(2.0));
    }

    #[test]
    fn test_fill_with_uses_cell_centers() {
        let mut field = Heightfield::new(4, 4, 10.0);
        field.fill_with(|x, _| x);
        assert_eq!(field.height_at(-15.0, 0.0), Some(-15.0));
        assert_eq!(field.height_at(12.0, 0.0), Some(15.0));
    }
}
