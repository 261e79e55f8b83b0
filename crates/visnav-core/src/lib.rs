//! Core types and laws for vision-guided robot navigation.
//!
//! This crate is intentionally small and free of I/O. It holds the marker
//! data model, the pose estimate between the robot and target markers, the
//! distance-to-speed and steering laws, and the single-slot hand-off used
//! between the control loop and its consumers.

mod logger;
mod marker;
mod motion;
mod pose;
mod slot;

pub use marker::{BoundingBox, MarkerDetection, MarkerPair, MarkerRole};
pub use motion::{
    speed_for_distance, ApproachParams, MotionCommand, MotionKind, MotionParams, MotionPlanner,
    UnknownMotionKind,
};
pub use pose::{estimate_from_pair, estimate_pose, PoseOffset};
pub use slot::LatestSlot;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

pub use visnav_grid::GridCell;
