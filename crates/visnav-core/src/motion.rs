//! Motion laws: distance/bearing (and optionally a planned path) to a command.
//!
//! Everything here is a pure function of its inputs. `MotionPlanner` only
//! carries the immutable parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use visnav_grid::GridCell;

use crate::pose::PoseOffset;

/// Discrete motion the robot firmware understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl MotionKind {
    pub const ALL: [MotionKind; 5] = [
        MotionKind::Forward,
        MotionKind::Backward,
        MotionKind::Left,
        MotionKind::Right,
        MotionKind::Stop,
    ];

    /// Wire name used by the `cmd=` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            MotionKind::Forward => "forward",
            MotionKind::Backward => "backward",
            MotionKind::Left => "left",
            MotionKind::Right => "right",
            MotionKind::Stop => "stop",
        }
    }

    #[inline]
    pub fn is_movement(self) -> bool {
        self != MotionKind::Stop
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`MotionKind`].
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("unknown motion command `{0}`")]
pub struct UnknownMotionKind(pub String);

impl FromStr for MotionKind {
    type Err = UnknownMotionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "f" => Ok(MotionKind::Forward),
            "backward" | "reverse" | "b" => Ok(MotionKind::Backward),
            "left" | "l" => Ok(MotionKind::Left),
            "right" | "r" => Ok(MotionKind::Right),
            "stop" | "s" => Ok(MotionKind::Stop),
            _ => Err(UnknownMotionKind(s.to_string())),
        }
    }
}

/// A motion paired with a speed in `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionCommand {
    pub kind: MotionKind,
    pub speed: u8,
}

impl MotionCommand {
    pub const STOP: MotionCommand = MotionCommand {
        kind: MotionKind::Stop,
        speed: 0,
    };

    /// Build a command; `Stop` always carries speed 0.
    pub fn new(kind: MotionKind, speed: u8) -> Self {
        match kind {
            MotionKind::Stop => Self::STOP,
            _ => Self { kind, speed },
        }
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        self.kind == MotionKind::Stop
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.speed)
    }
}

/// Thresholds of the distance-to-speed law.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// At or below this distance the robot stops.
    pub min_distance: f64,
    /// At or above this distance the robot runs at `max_speed`.
    pub max_distance: f64,
    pub max_speed: u8,
    /// Horizontal tolerance around the robot within which it drives straight.
    pub dead_band: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            min_distance: 50.0,
            max_distance: 300.0,
            max_speed: 255,
            dead_band: 50.0,
        }
    }
}

/// Parameters of the approach law (drive straight at the target until close).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApproachParams {
    /// Distance at which the speed saturates.
    pub reach: f64,
    /// Below or at this distance the robot stops.
    pub stop_radius: f64,
}

impl Default for ApproachParams {
    fn default() -> Self {
        Self {
            reach: 500.0,
            stop_radius: 100.0,
        }
    }
}

/// Speed for a given distance: 0 up to `min_distance`, `max_speed` from
/// `max_distance` on, linear in between.
pub fn speed_for_distance(params: &MotionParams, distance: f64) -> f64 {
    let max_speed = f64::from(params.max_speed);
    if distance <= params.min_distance {
        0.0
    } else if distance >= params.max_distance {
        max_speed
    } else {
        (distance - params.min_distance) / (params.max_distance - params.min_distance) * max_speed
    }
}

#[inline]
fn to_wire_speed(speed: f64) -> u8 {
    // truncation, matching the firmware's integer parameter
    speed.clamp(0.0, 255.0) as u8
}

/// Stateless mapping from pose (and path) to motion commands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionPlanner {
    params: MotionParams,
    approach: ApproachParams,
}

impl MotionPlanner {
    pub fn new(params: MotionParams) -> Self {
        Self {
            params,
            approach: ApproachParams::default(),
        }
    }

    pub fn with_approach(mut self, approach: ApproachParams) -> Self {
        self.approach = approach;
        self
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn speed(&self, distance: f64) -> f64 {
        speed_for_distance(&self.params, distance)
    }

    /// Steer toward the target by its horizontal offset, with a dead-band.
    pub fn plan_simple(&self, pose: &PoseOffset) -> MotionCommand {
        let speed = self.speed(pose.distance);
        if speed <= 0.0 {
            return MotionCommand::STOP;
        }
        let kind = if pose.bearing_offset < -self.params.dead_band {
            MotionKind::Left
        } else if pose.bearing_offset > self.params.dead_band {
            MotionKind::Right
        } else {
            MotionKind::Forward
        };
        MotionCommand::new(kind, to_wire_speed(speed))
    }

    /// Follow the first step of `path` in the fixed world frame.
    ///
    /// Row decreasing is `Forward`, row increasing `Backward`, column
    /// decreasing `Left`, column increasing `Right`. A path with fewer than
    /// two cells (no path, or already at the goal) stops the robot.
    pub fn plan_along_path(&self, pose: &PoseOffset, path: &[GridCell]) -> MotionCommand {
        let [current, next, ..] = path else {
            return MotionCommand::STOP;
        };
        let kind = match (next.row - current.row, next.col - current.col) {
            (-1, 0) => MotionKind::Forward,
            (1, 0) => MotionKind::Backward,
            (0, -1) => MotionKind::Left,
            (0, 1) => MotionKind::Right,
            step => {
                log::warn!("path step {step:?} is not a cardinal move; stopping");
                return MotionCommand::STOP;
            }
        };
        let speed = self.speed(pose.distance);
        if speed <= 0.0 {
            return MotionCommand::STOP;
        }
        MotionCommand::new(kind, to_wire_speed(speed))
    }

    /// Drive straight at the target, slowing with proximity.
    pub fn plan_approach(&self, pose: &PoseOffset) -> MotionCommand {
        if pose.distance <= self.approach.stop_radius {
            return MotionCommand::STOP;
        }
        let reach = self.approach.reach.max(f64::EPSILON);
        let speed = f64::from(self.params.max_speed) * pose.distance.min(reach) / reach;
        MotionCommand::new(MotionKind::Forward, to_wire_speed(speed))
    }
}
