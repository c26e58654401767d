/**
 * Position State
 *
 * Current pan/tilt pose with clamp-on-write limits. Every mutation
 * leaves both axes inside their limits; out-of-range requests are
 * clamped, never rejected.
 */

use std::fmt;

use crate::error::{Result, RigError};
use super::command::MotorCommand;

/// Inclusive angle range for one axis (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisLimits {
    pub min: i32,
    pub max: i32,
}

impl AxisLimits {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Limits for both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseLimits {
    pub horizontal: AxisLimits,
    pub vertical: AxisLimits,
}

impl PoseLimits {
    pub fn contains(&self, pose: Pose) -> bool {
        self.horizontal.contains(pose.horizontal) && self.vertical.contains(pose.vertical)
    }
}

impl Default for PoseLimits {
    fn default() -> Self {
        Self {
            horizontal: AxisLimits::new(0, 180),
            vertical: AxisLimits::new(45, 162),
        }
    }
}

/// (horizontal, vertical) angle pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    pub horizontal: i32,
    pub vertical: i32,
}

impl Pose {
    pub const HOME: Pose = Pose { horizontal: 90, vertical: 90 };

    pub const fn new(horizontal: i32, vertical: i32) -> Self {
        Self { horizontal, vertical }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::HOME
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H={}°, V={}°", self.horizontal, self.vertical)
    }
}

#[derive(Debug, Clone)]
pub struct PositionState {
    pose: Pose,
    limits: PoseLimits,
}

impl PositionState {
    /// Start at `home`, clamped into `limits`.
    pub fn new(limits: PoseLimits, home: Pose) -> Self {
        let pose = Pose::new(limits.horizontal.clamp(home.horizontal), limits.vertical.clamp(home.vertical));
        Self { pose, limits }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn limits(&self) -> PoseLimits {
        self.limits
    }

    /// Add a delta, clamping each axis. Returns the new pose.
    pub fn apply_delta(&mut self, cmd: MotorCommand) -> Pose {
        self.pose.horizontal = self.limits.horizontal.clamp(self.pose.horizontal.saturating_add(cmd.dh));
        self.pose.vertical = self.limits.vertical.clamp(self.pose.vertical.saturating_add(cmd.dv));
        self.pose
    }

    /// Replace the pose with one reported by the microcontroller.
    pub fn adopt(&mut self, pose: Pose) -> Result<Pose> {
        if !self.limits.contains(pose) {
            return Err(RigError::InvalidInput(format!("pose {pose} outside limits")));
        }
        self.pose = pose;
        Ok(self.pose)
    }
}

impl Default for PositionState {
    fn default() -> Self {
        Self::new(PoseLimits::default(), Pose::HOME)
    }
}
