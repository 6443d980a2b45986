//! Configuration loading for GrahaNav

use std::path::Path;
use std::time::Duration;

use graha_map::OdometryConfig;
use serde::Deserialize;

use crate::error::{NavError, Result};

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub robot: OdometryConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

/// Mothership connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Group id used in every topic name (default: "101")
    #[serde(default = "default_group")]
    pub group: String,

    /// Request a named test planet before announcing readiness
    #[serde(default)]
    pub test_planet: Option<String>,
}

/// Request/acknowledge timing
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    /// Quiet period before the watchdog alert fires (default: 3.0)
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: f32,

    /// Hard deadline for any acknowledgement (default: 10.0)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: f32,

    /// Inbound channel poll interval while waiting (default: 20)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Line-following drive settings
#[derive(Clone, Debug, Deserialize)]
pub struct DriveConfig {
    /// Wheel command while on the line, 0.0 to 1.0 (default: 0.5)
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,

    /// Fraction of speed removed from the inner wheel while searching (default: 0.6)
    #[serde(default = "default_steering_gain")]
    pub steering_gain: f32,

    /// Upper bound on control samples for one path (default: 4000)
    #[serde(default = "default_max_drive_samples")]
    pub max_drive_samples: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            test_planet: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            watchdog_secs: default_watchdog_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SessionConfig {
    pub fn watchdog(&self) -> Duration {
        seconds_or(self.watchdog_secs, default_watchdog_secs())
    }

    pub fn request_timeout(&self) -> Duration {
        seconds_or(self.request_timeout_secs, default_request_timeout_secs())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_speed: default_base_speed(),
            steering_gain: default_steering_gain(),
            max_drive_samples: default_max_drive_samples(),
        }
    }
}

impl NavConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NavConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection.group.is_empty() || self.connection.group.contains(['/', '#', '+']) {
            return Err(NavError::Config(format!(
                "connection.group {:?} is not a valid topic segment",
                self.connection.group
            )));
        }
        for (name, value) in [
            ("session.watchdog_secs", self.session.watchdog_secs),
            ("session.request_timeout_secs", self.session.request_timeout_secs),
            ("robot.wheel_base", self.robot.wheel_base),
            ("robot.wheel_diameter", self.robot.wheel_diameter),
            ("robot.ticks_per_revolution", self.robot.ticks_per_revolution),
            ("robot.cell_size", self.robot.cell_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.drive.base_speed) || self.drive.base_speed == 0.0 {
            return Err(NavError::Config(format!(
                "drive.base_speed must be in (0, 1], got {}",
                self.drive.base_speed
            )));
        }
        if self.drive.max_drive_samples == 0 {
            return Err(NavError::Config("drive.max_drive_samples must be > 0".into()));
        }
        Ok(())
    }
}

fn seconds_or(secs: f32, fallback: f32) -> Duration {
    Duration::try_from_secs_f32(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f32(fallback))
}

// Default value functions
fn default_group() -> String {
    "101".to_string()
}
fn default_watchdog_secs() -> f32 {
    3.0
}
fn default_request_timeout_secs() -> f32 {
    10.0
}
fn default_poll_interval_ms() -> u64 {
    20
}
fn default_base_speed() -> f32 {
    0.5
}
fn default_steering_gain() -> f32 {
    0.6
}
fn default_max_drive_samples() -> usize {
    4000
}
