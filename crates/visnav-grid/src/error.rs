use crate::GridCell;

/// Errors raised while building a grid or validating planner inputs.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("cell {cell} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        cell: GridCell,
        rows: usize,
        cols: usize,
    },
    #[error("grid has no cells")]
    Empty,
    #[error("row {row} has {got} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("invalid value {value} at ({row}, {col}); expected 0 (free) or 1 (wall)")]
    InvalidCell { row: usize, col: usize, value: u8 },
    #[error("unexpected character {ch:?} on line {line}")]
    InvalidChar { line: usize, ch: char },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
