//! Static occupancy grids and shortest-path search.
//!
//! ```
//! use visnav_grid::{find_path, GridCell, OccupancyGrid};
//!
//! let grid = OccupancyGrid::parse_text("000\n110\n000\n").unwrap();
//! let path = find_path(&grid, GridCell::new(0, 0), GridCell::new(2, 0)).unwrap();
//! assert_eq!(path.first(), Some(&GridCell::new(0, 0)));
//! assert_eq!(path.last(), Some(&GridCell::new(2, 0)));
//! assert_eq!(path.len(), 7);
//! ```

mod astar;
mod cell;
mod error;
mod grid;

pub use astar::{find_path, find_path_with_stats, manhattan, Path, PlannerStats};
pub use cell::{Cell, GridCell};
pub use error::GridError;
pub use grid::OccupancyGrid;
