//! Per-phase kernels run by [`crate::world::SwarmWorld::step`].
//!
//! ## Phase Order
//!
//! 1. Grid rebuild (in `world`) - freezes a neighbor snapshot for this step
//! 2. `separation` - gather phase, reads only the frozen grid and positions
//! 3. `steering` - chase acceleration toward the world target
//! 4. `movement` - damping, speed clamp, integration, ground lock, extent bounce
//!
//! The separation gather is independent per agent and runs on the rayon pool
//! with the `parallel` feature. Everything that writes agent state runs
//! sequentially afterwards.

pub mod movement;
pub mod separation;
pub mod steering;

pub use movement::*;
pub use separation::*;
pub use steering::*;

use std::ops::Range;

/// Upper bound on fan-out workers for chunked passes.
pub const MAX_WORKERS: usize = 8;

/// Worker count for chunked passes: hardware threads minus one, clamped to 1..=8.
pub fn worker_count() -> usize {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    threads.saturating_sub(1).clamp(1, MAX_WORKERS)
}

/// Split `0..n` into at most `workers` contiguous ranges of equal size
/// (the last one may be shorter). Empty input yields no ranges.
pub fn chunk_ranges(n: usize, workers: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let workers = workers.max(1);
    let chunk = n.div_ceil(workers);
    (0..workers)
        .map(|w| (w * chunk).min(n)..((w + 1) * chunk).min(n))
        .filter(|r| !r.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges_cover_exactly() {
        let ranges = chunk_ranges(10, 3);
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(2, 8), vec![0..1, 1..2]);
    }

    #[test]
    fn test_worker_count_bounds() {
        let w = worker_count();
        assert!((1..=MAX_WORKERS).contains(&w));
    }
}
