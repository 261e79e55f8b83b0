//! Static occupancy grid and its loaders.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Cell, GridCell, GridError};

/// Rectangular grid of free/wall cells, row-major.
///
/// Serializes as `{"cells": [[0, 1, ..], ..]}`; deserializing goes through
/// [`from_rows`](Self::from_rows), so a document cannot bypass validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridFile", into = "GridFile")]
pub struct OccupancyGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum GridFile {
    Object { cells: Vec<Vec<u8>> },
    Bare(Vec<Vec<u8>>),
}

impl TryFrom<GridFile> for OccupancyGrid {
    type Error = GridError;

    fn try_from(file: GridFile) -> Result<Self, Self::Error> {
        match file {
            GridFile::Object { cells } | GridFile::Bare(cells) => Self::from_rows(cells),
        }
    }
}

impl From<OccupancyGrid> for GridFile {
    fn from(grid: OccupancyGrid) -> Self {
        let cells = grid
            .cells
            .chunks(grid.cols)
            .map(|row| row.iter().map(|c| u8::from(c.is_wall())).collect())
            .collect();
        GridFile::Object { cells }
    }
}

impl OccupancyGrid {
    /// All-free grid of the given size.
    pub fn empty(rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![Cell::Free; rows * cols],
        })
    }

    /// Build from rows of `0` (free) / `1` (wall).
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, GridError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::Ragged {
                    row: r,
                    expected: cols,
                    got: row.len(),
                });
            }
            for (c, &value) in row.iter().enumerate() {
                cells.push(match value {
                    0 => Cell::Free,
                    1 => Cell::Wall,
                    _ => {
                        return Err(GridError::InvalidCell {
                            row: r,
                            col: c,
                            value,
                        })
                    }
                });
            }
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    /// Parse a text map: one row per line, `0`/`1` per cell.
    ///
    /// Whitespace and commas between cells are ignored, blank lines and lines
    /// starting with `#` are skipped.
    pub fn parse_text(text: &str) -> Result<Self, GridError> {
        let mut rows = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut row = Vec::with_capacity(line.len());
            for ch in line.chars() {
                match ch {
                    '0' => row.push(0),
                    '1' => row.push(1),
                    ',' => {}
                    c if c.is_whitespace() => {}
                    c => return Err(GridError::InvalidChar { line: idx + 1, ch: c }),
                }
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Parse `{"cells": [[0, 1, ..], ..]}` or a bare array of rows.
    pub fn from_json_str(json: &str) -> Result<Self, GridError> {
        Self::try_from(serde_json::from_str::<GridFile>(json)?)
    }

    /// Load a map from disk; `.json` files are parsed as JSON, anything else as text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let grid = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::parse_text(&raw)?
        };
        log::debug!(
            "loaded {}x{} grid from {} ({} walls)",
            grid.rows,
            grid.cols,
            path.display(),
            grid.wall_count()
        );
        Ok(grid)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_wall()).count()
    }

    /// Row-major index of `cell`, or `None` when out of bounds.
    #[inline]
    pub fn index(&self, cell: GridCell) -> Option<usize> {
        let r = usize::try_from(cell.row).ok()?;
        let c = usize::try_from(cell.col).ok()?;
        (r < self.rows && c < self.cols).then(|| r * self.cols + c)
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub fn cell_at(&self, idx: usize) -> GridCell {
        GridCell::new((idx / self.cols) as i32, (idx % self.cols) as i32)
    }

    #[inline]
    pub fn contains(&self, cell: GridCell) -> bool {
        self.index(cell).is_some()
    }

    pub fn get(&self, cell: GridCell) -> Option<Cell> {
        self.index(cell).map(|i| self.cells[i])
    }

    /// In bounds and not a wall.
    pub fn is_free(&self, cell: GridCell) -> bool {
        self.get(cell) == Some(Cell::Free)
    }

    pub fn set(&mut self, cell: GridCell, value: Cell) -> Result<(), GridError> {
        let idx = self.check(cell)?;
        self.cells[idx] = value;
        Ok(())
    }

    /// Validate that `cell` lies inside the grid; returns its index.
    pub fn check(&self, cell: GridCell) -> Result<usize, GridError> {
        self.index(cell).ok_or(GridError::OutOfBounds {
            cell,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Free cardinal neighbours of `cell`, in up/down/left/right order.
    pub fn free_neighbors(&self, cell: GridCell) -> impl Iterator<Item = GridCell> + '_ {
        cell.cardinal_neighbors()
            .into_iter()
            .filter(move |&n| self.is_free(n))
    }

    /// Render as the text format accepted by [`parse_text`](Self::parse_text).
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols) {
            for cell in row {
                out.push(if cell.is_wall() { '1' } else { '0' });
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_map_parses_with_comments_and_separators() {
        let grid = OccupancyGrid::parse_text("# maze\n0 1 0\n\n0,0,0\n").expect("grid");
        assert_eq!((grid.rows(), grid.cols()), (2, 3));
        assert_eq!(grid.get(GridCell::new(0, 1)), Some(Cell::Wall));
        assert!(grid.is_free(GridCell::new(1, 1)));
        assert_eq!(grid.to_text(), "010\n000\n");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = OccupancyGrid::from_rows(vec![vec![0, 0], vec![0]]).unwrap_err();
        assert!(matches!(
            err,
            GridError::Ragged {
                row: 1,
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn non_binary_values_are_rejected() {
        let err = OccupancyGrid::from_rows(vec![vec![0, 2]]).unwrap_err();
        assert!(matches!(err, GridError::InvalidCell { value: 2, .. }));
        let err = OccupancyGrid::parse_text("0x\n").unwrap_err();
        assert!(matches!(err, GridError::InvalidChar { line: 1, ch: 'x' }));
    }

    #[test]
    fn empty_maps_are_rejected() {
        assert!(matches!(OccupancyGrid::from_rows(vec![]), Err(GridError::Empty)));
        assert!(matches!(OccupancyGrid::parse_text("# nothing\n"), Err(GridError::Empty)));
        assert!(matches!(OccupancyGrid::empty(0, 4), Err(GridError::Empty)));
    }

    #[test]
    fn json_accepts_object_and_bare_forms() {
        let a = OccupancyGrid::from_json_str(r#"{"cells": [[0, 1], [1, 0]]}"#).expect("object");
        let b = OccupancyGrid::from_json_str("[[0, 1], [1, 0]]").expect("bare");
        assert_eq!(a, b);
        assert_eq!(a.wall_count(), 2);
    }

    #[test]
    fn serde_goes_through_validation() {
        let err = serde_json::from_str::<OccupancyGrid>(r#"{"rows":3,"cols":3,"cells":[]}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<OccupancyGrid>(r#"{"cells": [[0, 0], [0]]}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("row 1 has 1 cells"), "{err}");

        let grid = OccupancyGrid::parse_text("010\n001\n").expect("grid");
        let json = serde_json::to_string(&grid).expect("serialize");
        assert_eq!(json, r#"{"cells":[[0,1,0],[0,0,1]]}"#);
        let back: OccupancyGrid = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, grid);
    }

    #[test]
    fn bounds_are_checked_not_clamped() {
        let grid = OccupancyGrid::empty(3, 4).expect("grid");
        assert!(grid.check(GridCell::new(2, 3)).is_ok());
        for cell in [GridCell::new(3, 0), GridCell::new(0, 4), GridCell::new(-1, 0)] {
            assert!(matches!(
                grid.check(cell),
                Err(GridError::OutOfBounds { rows: 3, cols: 4, .. })
            ));
        }
    }

    #[test]
    fn neighbours_skip_walls_and_edges() {
        let mut grid = OccupancyGrid::empty(3, 3).expect("grid");
        grid.set(GridCell::new(0, 1), Cell::Wall).expect("in bounds");
        let n: Vec<_> = grid.free_neighbors(GridCell::new(0, 0)).collect();
        assert_eq!(n, vec![GridCell::new(1, 0)]);
    }
}
