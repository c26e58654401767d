/**
 * Vision Interfaces
 *
 * Narrow traits for the collaborators the rig consumes but does not
 * implement: a video source, a face detector and a hand classifier.
 * A `VisionBackend` hands out a fresh set for every tracking session.
 */

pub mod replay;

pub use replay::ReplayVision;

use crate::error::{Result, RigError};
use crate::rig::face::FaceBox;
use crate::rig::gesture::GestureSample;

/// One captured frame. Pixel layout is whatever the source and the
/// detectors agree on; the rig only needs the dimensions.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Sequence number within the session, starting at 0
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel (0 when `pixels` is not a packed image)
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        Self { index, width, height, channels, pixels }
    }

    /// Flip left-right in place. Frames that are not packed
    /// `width * height * channels` images are left untouched.
    pub fn mirror_horizontal(&mut self) {
        let px = self.channels as usize;
        let width = self.width as usize;
        let stride = width * px;
        if stride == 0 || self.pixels.len() != stride * self.height as usize {
            return;
        }

        for row in self.pixels.chunks_exact_mut(stride) {
            for x in 0..width / 2 {
                let (left, right) = (x * px, (width - 1 - x) * px);
                for c in 0..px {
                    row.swap(left + c, right + c);
                }
            }
        }
    }
}

/// Hand keypoints as reported by the hand detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landmarks {
    pub points: Vec<[f32; 3]>,
}

pub trait VideoSource: Send {
    fn open(&mut self) -> Result<()>;

    /// Next frame, or None once the source has ended or failed.
    fn read_frame(&mut self) -> Option<Frame>;

    fn release(&mut self);
}

pub trait FaceDetector: Send {
    /// Faces in detector order, possibly empty.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>>;
}

pub trait HandClassifier: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Landmarks>>;

    fn fingers_up(&mut self, landmarks: &Landmarks) -> Result<GestureSample>;

    /// Detection followed by finger classification.
    fn classify(&mut self, frame: &Frame) -> Result<Option<GestureSample>> {
        match self.detect(frame)? {
            Some(landmarks) => self.fingers_up(&landmarks).map(Some),
            None => Ok(None),
        }
    }
}

pub trait VisionBackend: Send + Sync {
    fn video_source(&self) -> Result<Box<dyn VideoSource>>;
    fn face_detector(&self) -> Result<Box<dyn FaceDetector>>;
    fn hand_classifier(&self) -> Result<Box<dyn HandClassifier>>;
}

/// Backend for rigs driven by hand only; the camera never opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVision;

struct NoCamera;

impl VideoSource for NoCamera {
    fn open(&mut self) -> Result<()> {
        Err(RigError::Video("no camera backend configured".to_string()))
    }

    fn read_frame(&mut self) -> Option<Frame> {
        None
    }

    fn release(&mut self) {}
}

struct Blind;

impl FaceDetector for Blind {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>> {
        Ok(Vec::new())
    }
}

impl HandClassifier for Blind {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<Landmarks>> {
        Ok(None)
    }

    fn fingers_up(&mut self, _landmarks: &Landmarks) -> Result<GestureSample> {
        Ok(GestureSample::default())
    }
}

impl VisionBackend for NoVision {
    fn video_source(&self) -> Result<Box<dyn VideoSource>> {
        Ok(Box::new(NoCamera))
    }

    fn face_detector(&self) -> Result<Box<dyn FaceDetector>> {
        Ok(Box::new(Blind))
    }

    fn hand_classifier(&self) -> Result<Box<dyn HandClassifier>> {
        Ok(Box::new(Blind))
    }
}
