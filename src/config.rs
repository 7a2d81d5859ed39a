//! Operating policies of the client, read from `rover-client.json`.
//!
//! The server address is not configurable; see [`crate::uplink`].

use crate::error::Result;
use crate::motor_profile::MAX_SPEED;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "rover-client.json";

/// Sign convention of forward motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// `up` drives both wheels with positive speed.
    Normal,
    /// Every wheel speed is negated.
    Inverted,
}

/// What the client answers after each command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgment {
    /// The literal text `OK`.
    Ok,
    /// Remaining battery capacity in percent, as decimal text.
    BatteryLevel,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DrivePolicy {
    /// Stop and idle the motors once the drive interval has passed.
    /// When off, the robot keeps moving until the next command.
    pub return_to_idle_after_move: bool,
    pub forward_polarity: Polarity,
    pub drive_interval_ms: u64,
    pub initial_speed: i32,
    /// Speeds above this use the high-speed rotation factor.
    pub high_speed_threshold: i32,
    pub rotate_low_speed_factor: f64,
    pub rotate_high_speed_factor: f64,
}

impl Default for DrivePolicy {
    fn default() -> Self {
        Self {
            return_to_idle_after_move: true,
            forward_polarity: Polarity::Normal,
            drive_interval_ms: 100,
            initial_speed: 100,
            high_speed_threshold: 300,
            rotate_low_speed_factor: 0.75,
            rotate_high_speed_factor: 0.5,
        }
    }
}

impl DrivePolicy {
    pub fn drive_interval(&self) -> Duration {
        Duration::from_millis(self.drive_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub drive: DrivePolicy,
    pub acknowledgment: Acknowledgment,
    /// Size of the pieces the report file is sent in.
    pub file_chunk_size: usize,
    /// Read timeout for the parameter of `speed` and `diode`; `None` blocks.
    pub parameter_timeout_ms: Option<u64>,
    /// Read timeout for the next command; `None` blocks.
    pub command_timeout_ms: Option<u64>,
    pub report_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            drive: DrivePolicy::default(),
            acknowledgment: Acknowledgment::Ok,
            file_chunk_size: 4096,
            parameter_timeout_ms: Some(5000),
            command_timeout_ms: None,
            report_path: PathBuf::from("data.csv"),
        }
    }
}

fn timeout(millis: Option<u64>) -> Option<Duration> {
    millis.filter(|&ms| ms > 0).map(Duration::from_millis)
}

impl ClientConfig {
    /// Reads the configuration file, falling back to defaults when it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no {} found, using default policies", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        log::info!("loaded policies from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)?;
        if config.file_chunk_size == 0 {
            return Err(invalid("file_chunk_size must be positive"));
        }
        let drive = &config.drive;
        if drive.rotate_low_speed_factor <= 0.0 || drive.rotate_high_speed_factor <= 0.0 {
            return Err(invalid("rotation factors must be positive"));
        }
        if drive.initial_speed < 0 || drive.initial_speed > MAX_SPEED {
            return Err(invalid("initial_speed must be between 0 and the profile's max speed"));
        }
        Ok(config)
    }

    pub fn parameter_timeout(&self) -> Option<Duration> {
        timeout(self.parameter_timeout_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        timeout(self.command_timeout_ms)
    }
}

fn invalid(message: &str) -> crate::error::Error {
    <serde_json::Error as serde::de::Error>::custom(message).into()
}
