//! Vision-guided navigation controller.
//!
//! Each camera frame is scanned for two QR fiducials, one on the robot
//! (payload containing `"car"`) and one on the goal (payload containing
//! `"target"`). Their offset becomes a motion command, optionally routed
//! around obstacles on a static grid with A*, and the command is sent to the
//! robot's HTTP control endpoint.
//!
//! ## Quickstart
//!
//! ```no_run
//! use visnav::{ControlLoop, ControllerConfig, ImageSequenceSource};
//! use visnav::fiducial::{FiducialDetector, QrDecoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::load_json("visnav.json")?;
//! let source = ImageSequenceSource::open("frames/")?;
//! let dispatcher = config.dispatcher()?;
//! let mut control =
//!     ControlLoop::from_config(&config, source, FiducialDetector::new(QrDecoder), dispatcher)?;
//! let summary = control.run()?;
//! println!("{} frames, {} commands", summary.frames, summary.commands);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `visnav::core`: markers, pose, motion laws, single-slot hand-off, logging.
//! - `visnav::grid`: occupancy grids and A*.
//! - `visnav::fiducial`: QR decoding and role resolution.
//! - `visnav::dispatch`: endpoints, HTTP transport, de-duplication, worker.
//! - [`ControlLoop`], [`ControllerConfig`], [`FrameSource`]: the loop itself.

pub use visnav_core as core;
pub use visnav_dispatch as dispatch;
pub use visnav_fiducial as fiducial;
pub use visnav_grid as grid;

mod config;
mod control;
mod error;
mod frame;

pub use config::{ConfigOverrides, ControllerConfig, DispatchConfig, GridConfig};
pub use control::{
    spawn_background, BackgroundLoop, ControlLoop, LoopReport, LoopState, LossPolicy,
    PlannerMode, RunSummary, Snapshot, StopHandle, StopReason,
};
pub use error::{CaptureError, ConfigError, ControlError};
pub use frame::{FrameSource, ImageSequenceSource};

pub use visnav_core::{MotionCommand, MotionKind};
