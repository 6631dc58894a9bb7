//! Spatial partitioning for efficient neighbor queries.
//!
//! Uniform 3D cells keyed by a single packed integer. The grid is a per-frame
//! derived index: it is rebuilt from scratch every step and never updated
//! incrementally, so it can't hold dangling entries for dead or moved agents.
//! Neighbor queries visit the 3x3x3 block around a point, which keeps the cost
//! near O(n) for roughly uniform densities instead of O(n^2) pairwise.

use crate::components::AgentIndex;
use crate::math::Float3;
use std::collections::HashMap;

/// Bits kept per axis when packing a cell coordinate into a key.
pub const CELL_AXIS_BITS: u32 = 21;
const CELL_AXIS_MASK: i64 = (1 << CELL_AXIS_BITS) - 1;

/// Smallest usable cell size; guards the division in `world_to_cell`.
const MIN_CELL_SIZE: f32 = 1.0e-3;

/// Pack a cell coordinate into one key.
///
/// Each axis is masked to [`CELL_AXIS_BITS`] bits, so coordinates beyond
/// +/- 2^20 cells wrap onto other cells. World extent is bounded by config and
/// enforced at spawn time, not here.
#[inline]
pub fn pack_cell(x: i32, y: i32, z: i32) -> i64 {
    ((x as i64 & CELL_AXIS_MASK) << (2 * CELL_AXIS_BITS))
        | ((y as i64 & CELL_AXIS_MASK) << CELL_AXIS_BITS)
        | (z as i64 & CELL_AXIS_MASK)
}

/// Grid-based spatial hash over agent positions.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    /// Packed cell key to the agent indices inside that cell.
    cells: HashMap<i64, Vec<AgentIndex>>,
    count: usize,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(200.0)
    }
}

impl SpatialGrid {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: Self::sanitize(cell_size),
            cells: HashMap::new(),
            count: 0,
        }
    }

    fn sanitize(cell_size: f32) -> f32 {
        if cell_size.is_finite() && cell_size > MIN_CELL_SIZE {
            cell_size
        } else {
            MIN_CELL_SIZE
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Change the cell size. Clears the grid; rebuild before querying.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = Self::sanitize(cell_size);
        self.clear();
    }

    /// Convert a world position to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, p: Float3) -> (i32, i32, i32) {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
            (p.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.count = 0;
    }

    /// Append an agent index to the cell containing `p`.
    pub fn insert(&mut self, p: Float3, index: AgentIndex) {
        let (x, y, z) = self.world_to_cell(p);
        self.cells.entry(pack_cell(x, y, z)).or_default().push(index);
        self.count += 1;
    }

    /// Clear and repopulate from parallel position arrays.
    pub fn build(&mut self, px: &[f32], py: &[f32], pz: &[f32]) {
        self.build_where(px, py, pz, |_| true);
    }

    /// Clear and repopulate, keeping only indices accepted by `keep`.
    pub fn build_where(
        &mut self,
        px: &[f32],
        py: &[f32],
        pz: &[f32],
        keep: impl Fn(AgentIndex) -> bool,
    ) {
        debug_assert!(px.len() == py.len() && py.len() == pz.len());
        self.clear();
        let n = px.len().min(py.len()).min(pz.len());
        self.cells.reserve(n);
        for i in 0..n {
            if keep(i) {
                self.insert(Float3::new(px[i], py[i], pz[i]), i);
            }
        }
    }

    /// Visit every index stored in the 3x3x3 block of cells around `p`.
    pub fn for_neighbors(&self, p: Float3, mut visitor: impl FnMut(AgentIndex)) {
        let (cx, cy, cz) = self.world_to_cell(p);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let key = pack_cell(
                        cx.wrapping_add(dx),
                        cy.wrapping_add(dy),
                        cz.wrapping_add(dz),
                    );
                    if let Some(entries) = self.cells.get(&key) {
                        for &j in entries {
                            visitor(j);
                        }
                    }
                }
            }
        }
    }

    /// Collect the neighbor block of `p` into a vector (debugging/tests).
    pub fn neighbors(&self, p: Float3) -> Vec<AgentIndex> {
        let mut out = Vec::new();
        self.for_neighbors(p, |j| out.push(j));
        out
    }

    /// Indices in one cell.
    pub fn cell_entries(&self, cell: (i32, i32, i32)) -> &[AgentIndex] {
        self.cells
            .get(&pack_cell(cell.0, cell.1, cell.2))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total indices stored across all cells.
    pub fn total_count(&self) -> usize {
        self.count
    }
}
