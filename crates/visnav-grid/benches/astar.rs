//! A* planner benchmarks.
//!
//! Run with: cargo bench -p visnav-grid

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use visnav_grid::{find_path, Cell, GridCell, OccupancyGrid};

/// Serpentine maze: every other row is a wall with a gap at alternating ends.
fn serpentine(size: usize) -> OccupancyGrid {
    let mut grid = OccupancyGrid::empty(size, size).expect("non-empty grid");
    for row in (1..size).step_by(2) {
        let gap = if (row / 2) % 2 == 0 { size - 1 } else { 0 };
        for col in 0..size {
            if col != gap {
                grid.set(GridCell::new(row as i32, col as i32), Cell::Wall)
                    .expect("in bounds");
            }
        }
    }
    grid
}

fn bench_open_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_open");
    for size in [20usize, 64, 256] {
        let grid = OccupancyGrid::empty(size, size).expect("non-empty grid");
        let goal = GridCell::new(size as i32 - 1, size as i32 - 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| find_path(black_box(grid), GridCell::new(0, 0), goal))
        });
    }
    group.finish();
}

fn bench_serpentine(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_serpentine");
    for size in [21usize, 65, 129] {
        let grid = serpentine(size);
        let goal = GridCell::new(size as i32 - 1, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| find_path(black_box(grid), GridCell::new(0, 0), goal))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_open_grid, bench_serpentine);
criterion_main!(benches);
