/**
 * Motor Commands
 *
 * Relative angular moves sent to the rig, and the jog directions
 * used by manual control and the gesture table.
 */

use std::str::FromStr;

use crate::error::RigError;

/// Signed pan/tilt delta in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorCommand {
    pub dh: i32,
    pub dv: i32,
}

impl MotorCommand {
    pub fn new(dh: i32, dv: i32) -> Self {
        Self { dh, dv }
    }
}

/// Jog direction for manual control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Delta for one jog of `step` degrees
    pub fn delta(&self, step: i32) -> MotorCommand {
        match self {
            Direction::Up => MotorCommand::new(0, step),
            Direction::Down => MotorCommand::new(0, -step),
            Direction::Left => MotorCommand::new(-step, 0),
            Direction::Right => MotorCommand::new(step, 0),
        }
    }
}

impl FromStr for Direction {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Direction::Up),
            "down" | "s" => Ok(Direction::Down),
            "left" | "a" => Ok(Direction::Left),
            "right" | "d" => Ok(Direction::Right),
            other => Err(RigError::InvalidInput(format!("unknown direction: {other}"))),
        }
    }
}
