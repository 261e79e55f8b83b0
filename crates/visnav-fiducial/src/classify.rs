//! Payload → role classification and per-frame role resolution.

use visnav_core::{MarkerDetection, MarkerPair, MarkerRole};

/// Classify a decoded payload.
///
/// Case-insensitive substring match: `"car"` marks the robot, `"target"` the
/// goal. A payload containing both is the robot.
pub fn classify_payload(payload: &str) -> MarkerRole {
    let lower = payload.to_lowercase();
    if lower.contains("car") {
        MarkerRole::Robot
    } else if lower.contains("target") {
        MarkerRole::Target
    } else {
        MarkerRole::Unknown
    }
}

/// Fold detections into at most one robot and one target.
///
/// Detections are taken in decoder order and the last one of each role
/// wins. Replacing an earlier candidate is logged, not rejected.
pub fn resolve_markers<I>(detections: I) -> MarkerPair
where
    I: IntoIterator<Item = MarkerDetection>,
{
    detections
        .into_iter()
        .fold(MarkerPair::default(), |mut pair, det| {
            let slot = match det.role {
                MarkerRole::Robot => &mut pair.robot,
                MarkerRole::Target => &mut pair.target,
                MarkerRole::Unknown => return pair,
            };
            if let Some(prev) = slot.replace(det) {
                log::warn!(
                    "several {:?} markers in frame; {:?} replaced by a later one",
                    prev.role,
                    prev.payload
                );
            }
            pair
        })
}
