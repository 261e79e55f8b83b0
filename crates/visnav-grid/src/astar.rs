//! A* on a 4-connected grid with unit step cost and the Manhattan heuristic.
//!
//! The frontier is a binary heap ordered by `(f, insertion sequence)`, so
//! ties in `f` are served first-in first-out and the result is deterministic
//! for identical inputs. Improved nodes are pushed again instead of being
//! decreased in place; stale entries are skipped when popped.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{GridCell, GridError, OccupancyGrid};

/// Ordered start→goal cells, inclusive. Empty when no path exists.
pub type Path = Vec<GridCell>;

/// Manhattan distance, admissible and consistent for 4-connected unit moves.
#[inline]
pub fn manhattan(a: GridCell, b: GridCell) -> u32 {
    a.manhattan_distance(b)
}

/// Search effort of one planner run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerStats {
    /// Nodes popped and expanded.
    pub expanded: usize,
    /// Frontier insertions, including re-insertions.
    pub pushed: usize,
    /// Popped entries discarded as stale.
    pub stale: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrontierEntry {
    f: u32,
    seq: u64,
    g: u32,
    idx: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse to pop the smallest (f, seq).
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `goal`.
///
/// Returns `Ok(vec![])` when the goal is unreachable; that is a normal
/// outcome. Out-of-bounds endpoints are rejected with
/// [`GridError::OutOfBounds`].
pub fn find_path(grid: &OccupancyGrid, start: GridCell, goal: GridCell) -> Result<Path, GridError> {
    find_path_with_stats(grid, start, goal).map(|(path, _)| path)
}

/// [`find_path`] that also reports search effort.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(grid), fields(rows = grid.rows(), cols = grid.cols()))
)]
pub fn find_path_with_stats(
    grid: &OccupancyGrid,
    start: GridCell,
    goal: GridCell,
) -> Result<(Path, PlannerStats), GridError> {
    let start_idx = grid.check(start)?;
    let goal_idx = grid.check(goal)?;

    let mut stats = PlannerStats::default();
    let mut g_score = vec![u32::MAX; grid.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    g_score[start_idx] = 0;
    frontier.push(FrontierEntry {
        f: manhattan(start, goal),
        seq,
        g: 0,
        idx: start_idx,
    });
    stats.pushed += 1;

    while let Some(entry) = frontier.pop() {
        if closed[entry.idx] || entry.g > g_score[entry.idx] {
            stats.stale += 1;
            continue;
        }
        if entry.idx == goal_idx {
            let path = reconstruct(grid, &came_from, goal_idx);
            log::debug!(
                "path {start} -> {goal}: {} cells, {} expanded",
                path.len(),
                stats.expanded
            );
            return Ok((path, stats));
        }
        closed[entry.idx] = true;
        stats.expanded += 1;

        let current = grid.cell_at(entry.idx);
        let tentative = entry.g + 1;
        for neighbor in grid.free_neighbors(current) {
            let Some(n_idx) = grid.index(neighbor) else {
                continue;
            };
            if tentative < g_score[n_idx] {
                g_score[n_idx] = tentative;
                came_from[n_idx] = Some(entry.idx);
                seq += 1;
                frontier.push(FrontierEntry {
                    f: tentative + manhattan(neighbor, goal),
                    seq,
                    g: tentative,
                    idx: n_idx,
                });
                stats.pushed += 1;
            }
        }
    }

    log::debug!(
        "no path {start} -> {goal} after expanding {} cells",
        stats.expanded
    );
    Ok((Vec::new(), stats))
}

fn reconstruct(grid: &OccupancyGrid, came_from: &[Option<usize>], goal_idx: usize) -> Path {
    let mut path = vec![grid.cell_at(goal_idx)];
    let mut idx = goal_idx;
    while let Some(prev) = came_from[idx] {
        path.push(grid.cell_at(prev));
        idx = prev;
    }
    path.reverse();
    path
}
