//! Controller configuration, loaded once at startup.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visnav_core::{ApproachParams, MotionParams, MotionPlanner};
use visnav_dispatch::{
    CommandDispatcher, DispatchPolicy, Endpoint, HttpTransport, TransportError,
};

use crate::control::{LossPolicy, PlannerMode};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub policy: DispatchPolicy,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: DispatchPolicy::Unconditional,
            timeout_ms: 250,
        }
    }
}

/// Static map used in [`PlannerMode::Path`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Text or JSON map file.
    pub map: PathBuf,
    /// Image pixels per grid cell.
    #[serde(default = "default_cell_px")]
    pub cell_px: f32,
}

fn default_cell_px() -> f32 {
    10.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub min_distance: f64,
    pub max_distance: f64,
    pub max_speed: u8,
    pub dead_band: f64,
    pub endpoint: Endpoint,
    pub dispatch: DispatchConfig,
    /// Send `Stop` when fewer than two markers are visible.
    pub stop_on_loss: bool,
    pub mode: PlannerMode,
    pub approach: ApproachParams,
    pub grid: Option<GridConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let motion = MotionParams::default();
        Self {
            min_distance: motion.min_distance,
            max_distance: motion.max_distance,
            max_speed: motion.max_speed,
            dead_band: motion.dead_band,
            endpoint: Endpoint::default(),
            dispatch: DispatchConfig::default(),
            stop_on_loss: true,
            mode: PlannerMode::Simple,
            approach: ApproachParams::default(),
            grid: None,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_distance, self.max_distance);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
            return Err(ConfigError::InvalidThresholds { min, max });
        }
        if !self.dead_band.is_finite() || self.dead_band < 0.0 {
            return Err(ConfigError::InvalidDeadBand(self.dead_band));
        }
        if self.max_speed == 0 {
            return Err(ConfigError::InvalidSpeed);
        }
        if !(self.approach.reach > 0.0 && self.approach.reach.is_finite()) {
            return Err(ConfigError::InvalidThresholds {
                min: self.approach.stop_radius,
                max: self.approach.reach,
            });
        }
        match (&self.grid, self.mode) {
            (None, PlannerMode::Path) => {
                return Err(ConfigError::Grid("path mode needs a grid map".into()))
            }
            (Some(grid), _) if !(grid.cell_px.is_finite() && grid.cell_px > 0.0) => {
                return Err(ConfigError::Grid(format!(
                    "cell_px must be positive, got {}",
                    grid.cell_px
                )))
            }
            _ => {}
        }
        Ok(())
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            max_speed: self.max_speed,
            dead_band: self.dead_band,
        }
    }

    pub fn planner(&self) -> MotionPlanner {
        MotionPlanner::new(self.motion_params()).with_approach(self.approach)
    }

    pub fn loss_policy(&self) -> LossPolicy {
        if self.stop_on_loss {
            LossPolicy::Stop
        } else {
            LossPolicy::Hold
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch.timeout_ms)
    }

    /// HTTP dispatcher for the configured endpoint and policy.
    pub fn dispatcher(&self) -> Result<CommandDispatcher<HttpTransport>, TransportError> {
        let transport = HttpTransport::new(self.timeout())?;
        Ok(CommandDispatcher::new(
            self.endpoint.clone(),
            transport,
            self.dispatch.policy,
        ))
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub max_speed: Option<u8>,
    pub hold_on_loss: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ControllerConfig) {
        if let Some(base) = &self.endpoint {
            config.endpoint = config.endpoint.clone().with_base(base.clone());
        }
        if let Some(v) = self.min_distance {
            config.min_distance = v;
        }
        if let Some(v) = self.max_distance {
            config.max_distance = v;
        }
        if let Some(v) = self.max_speed {
            config.max_speed = v;
        }
        if self.hold_on_loss {
            config.stop_on_loss = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_constants() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.min_distance, 50.0);
        assert_eq!(cfg.max_distance, 300.0);
        assert_eq!(cfg.max_speed, 255);
        assert_eq!(cfg.dead_band, 50.0);
        assert_eq!(cfg.endpoint.base(), "http://esp32-car.local/control");
        assert!(cfg.stop_on_loss);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = ControllerConfig::from_json_str(
            r#"{
                "max_speed": 180,
                "endpoint": { "style": "paths", "base": "http://192.168.4.1" },
                "dispatch": { "policy": "deduplicated" },
                "mode": "path",
                "grid": { "map": "maze.txt" }
            }"#,
        )
        .expect("config");
        assert_eq!(cfg.max_speed, 180);
        assert_eq!(cfg.min_distance, 50.0);
        assert_eq!(cfg.dispatch.policy, DispatchPolicy::Deduplicated);
        assert_eq!(cfg.dispatch.timeout_ms, 250);
        assert_eq!(cfg.mode, PlannerMode::Path);
        assert_eq!(cfg.grid.as_ref().map(|g| g.cell_px), Some(10.0));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = ControllerConfig {
            min_distance: 300.0,
            max_distance: 300.0,
            ..ControllerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));

        let cfg = ControllerConfig {
            max_distance: f64::NAN,
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn path_mode_requires_a_grid() {
        let cfg = ControllerConfig {
            mode: PlannerMode::Path,
            ..ControllerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Grid(_))));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = ControllerConfig::default();
        ConfigOverrides {
            endpoint: Some("http://10.0.0.7/control".into()),
            max_distance: Some(400.0),
            max_speed: Some(200),
            hold_on_loss: true,
            ..ConfigOverrides::default()
        }
        .apply(&mut cfg);
        assert_eq!(
            cfg.endpoint,
            Endpoint::Query {
                base: "http://10.0.0.7/control".into()
            }
        );
        assert_eq!(cfg.max_distance, 400.0);
        assert_eq!(cfg.max_speed, 200);
        assert_eq!(cfg.loss_policy(), LossPolicy::Hold);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ControllerConfig::load_json(dir.path().join("none.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
