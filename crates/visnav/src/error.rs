use std::path::PathBuf;

use visnav_dispatch::TransportError;
use visnav_grid::GridError;

/// The frame source could not be opened or a frame could not be read.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("cannot open frame source {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read frame {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("min_distance ({min}) must be finite and below max_distance ({max})")]
    InvalidThresholds { min: f64, max: f64 },
    #[error("dead_band must be finite and non-negative, got {0}")]
    InvalidDeadBand(f64),
    #[error("max_speed must be above zero")]
    InvalidSpeed,
    #[error("grid configuration: {0}")]
    Grid(String),
}

/// Errors that end a control run.
#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to load the grid map: {0}")]
    Grid(#[from] GridError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to start thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("control thread panicked")]
    Panicked,
}
