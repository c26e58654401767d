use std::fmt;
use std::str::FromStr;

use crate::error::RigError;

/// Tracking behaviour currently driving the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    Idle,
    Face,
    Gesture,
    Manual,
}

impl TrackingMode {
    /// Name announced to the microcontroller in `MODE:<name>`.
    pub fn announcement(&self) -> &'static str {
        match self {
            TrackingMode::Idle => "Idle",
            TrackingMode::Face => "Face Tracking Mode",
            TrackingMode::Gesture => "Gesture Tracking Mode",
            TrackingMode::Manual => "Manual Tracking Mode",
        }
    }

    /// Status line shown while the mode is running.
    pub fn active_status(&self) -> &'static str {
        match self {
            TrackingMode::Idle => "Idle",
            TrackingMode::Face => "Face Tracking: Active",
            TrackingMode::Gesture => "Gesture Tracking: Active",
            TrackingMode::Manual => "Manual Tracking Mode: Active",
        }
    }

    /// Status line shown once the mode's task has exited.
    pub fn inactive_status(&self) -> &'static str {
        match self {
            TrackingMode::Idle => "Idle",
            TrackingMode::Face => "Face Tracking: Inactive",
            TrackingMode::Gesture => "Gesture Tracking: Inactive",
            TrackingMode::Manual => "Manual Tracking Mode: Inactive",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TrackingMode::Idle)
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingMode::Idle => "idle",
            TrackingMode::Face => "face",
            TrackingMode::Gesture => "gesture",
            TrackingMode::Manual => "manual",
        };
        f.write_str(name)
    }
}

impl FromStr for TrackingMode {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(TrackingMode::Idle),
            "face" => Ok(TrackingMode::Face),
            "gesture" => Ok(TrackingMode::Gesture),
            "manual" => Ok(TrackingMode::Manual),
            other => Err(RigError::InvalidInput(format!("unknown tracking mode: {other}"))),
        }
    }
}
