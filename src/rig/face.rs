/**
 * Face Proportional Mapper
 *
 * Maps the offset of a detected face from the frame centre to a pan/tilt
 * delta. Image rows grow downward, so the vertical sign is flipped.
 * Offsets are worked out in half pixels so odd box and frame sizes
 * floor the same way the real-valued centre would.
 *
 * With several faces the first one in detector order is used. Detectors
 * that reorder results between frames will make the target flicker.
 */

use super::command::MotorCommand;

pub const DEFAULT_GAIN: i32 = 20;

/// Face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Centre in half-pixel units: (2x + w, 2y + h)
    pub fn doubled_centre(&self) -> (i32, i32) {
        (2 * self.x + self.w, 2 * self.y + self.h)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FaceMapper {
    gain_x: i32,
    gain_y: i32,
}

impl FaceMapper {
    /// Gains are pixels per degree; non-positive gains fall back to 1.
    pub fn new(gain_x: i32, gain_y: i32) -> Self {
        Self {
            gain_x: gain_x.max(1),
            gain_y: gain_y.max(1),
        }
    }

    /// Command for the primary face, or None when no face was found.
    pub fn map(&self, faces: &[FaceBox], width: u32, height: u32) -> Option<MotorCommand> {
        let face = faces.first()?;
        let (cx2, cy2) = face.doubled_centre();

        Some(MotorCommand::new(
            (cx2 - width as i32).div_euclid(2 * self.gain_x),
            (height as i32 - cy2).div_euclid(2 * self.gain_y),
        ))
    }
}

impl Default for FaceMapper {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN, DEFAULT_GAIN)
    }
}
