use serde::{Deserialize, Serialize};

/// Integer cell coordinates `(row, col)` on an occupancy grid.
///
/// Signed so that neighbours of border cells and pixel projections outside
/// the map can be represented and rejected explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

impl GridCell {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Cell containing the image point `(x, y)` when each cell spans
    /// `cell_px` pixels: `row = y / cell_px`, `col = x / cell_px`, floored.
    pub fn from_pixel(x: f32, y: f32, cell_px: f32) -> Self {
        let s = cell_px.max(f32::EPSILON);
        Self::new((y / s).floor() as i32, (x / s).floor() as i32)
    }

    #[inline]
    pub fn manhattan_distance(self, other: GridCell) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    #[inline]
    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    /// The four cardinal neighbours: up, down, left, right.
    pub fn cardinal_neighbors(self) -> [GridCell; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Occupancy of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Free,
    Wall,
}

impl Cell {
    #[inline]
    pub fn is_wall(self) -> bool {
        self == Cell::Wall
    }
}
