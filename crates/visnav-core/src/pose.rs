//! Relative pose between the robot and target markers.

use serde::{Deserialize, Serialize};

use crate::marker::{BoundingBox, MarkerPair};

/// Offset from the robot marker to the target marker, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseOffset {
    pub dx: f64,
    pub dy: f64,
    /// Euclidean distance between the two reference points.
    pub distance: f64,
    /// Signed horizontal offset `target_x - robot_x`; negative means the
    /// target is to the left of the robot.
    pub bearing_offset: f64,
}

/// Estimate the offset between two markers.
///
/// Both boxes are referenced by their top-left origin, not their centroid.
pub fn estimate_pose(robot: &BoundingBox, target: &BoundingBox) -> PoseOffset {
    let rx = f64::from(robot.left);
    let ry = f64::from(robot.top);
    let tx = f64::from(target.left);
    let ty = f64::from(target.top);

    let dx = tx - rx;
    let dy = ty - ry;
    PoseOffset {
        dx,
        dy,
        distance: (dx * dx + dy * dy).sqrt(),
        bearing_offset: tx - rx,
    }
}

/// Estimate the pose from a resolved marker pair; `None` unless both are present.
pub fn estimate_from_pair(pair: &MarkerPair) -> Option<PoseOffset> {
    let (robot, target) = pair.both()?;
    Some(estimate_pose(&robot.bbox, &target.bbox))
}
