//! Shapes of the robot's HTTP control surface.

use serde::{Deserialize, Serialize};
use visnav_core::{MotionCommand, MotionKind};

/// Default control URL of the robot firmware.
pub const DEFAULT_BASE: &str = "http://esp32-car.local/control";

/// One HTTP GET the robot must receive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandRequest {
    pub url: String,
}

impl CommandRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// How a [`MotionCommand`] maps onto URLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum Endpoint {
    /// `GET <base>?cmd=<kind>&speed=<n>`.
    Query { base: String },
    /// `GET <base>/setSpeed?value=<n>` then `GET <base>/<direction>`;
    /// stop is a single `GET <base>/stop`.
    Paths { base: String },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Query {
            base: DEFAULT_BASE.to_string(),
        }
    }
}

impl Endpoint {
    pub fn base(&self) -> &str {
        match self {
            Endpoint::Query { base } | Endpoint::Paths { base } => base,
        }
    }

    /// Replace the base URL, keeping the style.
    pub fn with_base(self, base: impl Into<String>) -> Self {
        let base = base.into();
        match self {
            Endpoint::Query { .. } => Endpoint::Query { base },
            Endpoint::Paths { .. } => Endpoint::Paths { base },
        }
    }

    /// Requests to issue, in order, for `command`.
    pub fn requests(&self, command: &MotionCommand) -> Vec<CommandRequest> {
        match self {
            Endpoint::Query { base } => vec![CommandRequest::new(format!(
                "{base}?cmd={}&speed={}",
                command.kind.as_str(),
                command.speed
            ))],
            Endpoint::Paths { base } => {
                let base = base.trim_end_matches('/');
                let route = match command.kind {
                    MotionKind::Stop => return vec![CommandRequest::new(format!("{base}/stop"))],
                    MotionKind::Forward => "forward",
                    MotionKind::Backward => "reverse",
                    MotionKind::Left => "left",
                    MotionKind::Right => "right",
                };
                vec![
                    CommandRequest::new(format!("{base}/setSpeed?value={}", command.speed)),
                    CommandRequest::new(format!("{base}/{route}")),
                ]
            }
        }
    }
}
