//! Configuration for the pan/tilt rig, loaded from YAML.

use crate::error::{Result, RigError};
use crate::rig::{AxisLimits, Pose, PoseLimits, TrackingSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link to the rig firmware
    pub serial: SerialConfig,

    /// Mechanical limits and home pose
    pub limits: LimitsConfig,

    /// Face tracking gains
    pub face: FaceConfig,

    /// Gesture tracking parameters
    pub gesture: GestureConfig,

    /// Manual jog parameters
    pub manual: ManualConfig,

    /// Tracking loop pacing
    pub tracking: TrackingConfig,
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path or COM port name
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Give up on a write after this long
    pub write_timeout_ms: u64,

    /// How long a reset waits for the INIT reply
    pub reset_timeout_ms: u64,
}

/// Axis limits in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub horizontal_min: i32,
    pub horizontal_max: i32,
    pub vertical_min: i32,
    pub vertical_max: i32,

    /// Pose assumed at startup
    pub home_horizontal: i32,
    pub home_vertical: i32,
}

/// Face mapper gains (pixels of offset per degree)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    pub gain_x: i32,
    pub gain_y: i32,
}

/// Gesture debouncing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Consecutive identical frames before a gesture fires
    pub threshold: u32,

    /// Degrees moved per gesture
    pub step: i32,

    /// Mirror frames before classification
    pub mirror: bool,
}

/// Manual jog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    /// Degrees moved per jog
    pub step: i32,
}

/// Tracking loop pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Pause between processed frames
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            limits: LimitsConfig::default(),
            face: FaceConfig::default(),
            gesture: GestureConfig::default(),
            manual: ManualConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            write_timeout_ms: 200,
            reset_timeout_ms: 1000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            horizontal_min: 0,
            horizontal_max: 180,
            vertical_min: 45,
            vertical_max: 162,
            home_horizontal: 90,
            home_vertical: 90,
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self { gain_x: 20, gain_y: 20 }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 8,
            step: 9,
            mirror: true,
        }
    }
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self { step: 9 }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 20 }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| RigError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| RigError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn pose_limits(&self) -> PoseLimits {
        let l = &self.limits;
        PoseLimits {
            horizontal: AxisLimits::new(l.horizontal_min, l.horizontal_max),
            vertical: AxisLimits::new(l.vertical_min, l.vertical_max),
        }
    }

    pub fn home(&self) -> Pose {
        Pose::new(self.limits.home_horizontal, self.limits.home_vertical)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.write_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.reset_timeout_ms)
    }

    pub fn tracking_settings(&self) -> TrackingSettings {
        TrackingSettings {
            face_gain_x: self.face.gain_x,
            face_gain_y: self.face.gain_y,
            gesture_threshold: self.gesture.threshold,
            gesture_step: self.gesture.step,
            mirror_gestures: self.gesture.mirror,
            manual_step: self.manual.step,
            poll_interval: Duration::from_millis(self.tracking.poll_interval_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(RigError::ConfigError("Serial port must not be empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(RigError::ConfigError("Baud rate must be greater than 0".to_string()));
        }
        if self.serial.write_timeout_ms == 0 || self.serial.reset_timeout_ms == 0 {
            return Err(RigError::ConfigError("Serial timeouts must be greater than 0".to_string()));
        }

        let limits = self.pose_limits();
        if limits.horizontal.min > limits.horizontal.max || limits.vertical.min > limits.vertical.max {
            return Err(RigError::ConfigError("Axis limits must have min <= max".to_string()));
        }
        if !limits.contains(self.home()) {
            return Err(RigError::ConfigError(format!("Home pose {} is outside the limits", self.home())));
        }

        if self.face.gain_x <= 0 || self.face.gain_y <= 0 {
            return Err(RigError::ConfigError("Face gains must be greater than 0".to_string()));
        }
        if self.gesture.threshold == 0 {
            return Err(RigError::ConfigError("Gesture threshold must be greater than 0".to_string()));
        }
        if self.gesture.step <= 0 || self.manual.step <= 0 {
            return Err(RigError::ConfigError("Jog steps must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pan/tilt rig configuration

# Serial link to the firmware
serial:
  port: "/dev/ttyACM0"
  baud_rate: 9600
  write_timeout_ms: 200
  reset_timeout_ms: 1000

# Mechanical limits (degrees)
limits:
  horizontal_min: 0
  horizontal_max: 180
  vertical_min: 45
  vertical_max: 162
  home_horizontal: 90
  home_vertical: 90

# Face tracking: pixels of offset per degree of correction
face:
  gain_x: 20
  gain_y: 20

# Gesture tracking
gesture:
  threshold: 8
  step: 9
  mirror: true

# Manual jog
manual:
  step: 9

# Tracking loop
tracking:
  poll_interval_ms: 20
"#;
