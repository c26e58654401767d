//! Scripted vision backend.
//!
//! Replays per-frame detections from a text script, one frame per line:
//!
//! ```text
//! # frames are 640x480 unless changed
//! size 640 480
//! face 300 200 40 40
//! face 580 20 40 40; 300 200 40 40
//! hand 0 1 0 0 0
//! repeat 8 hand 0 1 1 0 0
//! none
//! ```
//!
//! The video source ends when the script runs out.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, RigError};
use crate::rig::face::FaceBox;
use crate::rig::gesture::GestureSample;
use super::{FaceDetector, Frame, HandClassifier, Landmarks, VideoSource, VisionBackend};

/// Most frames a script may expand to, `repeat` lines included
pub const MAX_FRAMES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFrame {
    pub width: u32,
    pub height: u32,
    pub faces: Vec<FaceBox>,
    pub hand: Option<GestureSample>,
}

#[derive(Debug, Clone)]
pub struct ReplayVision {
    frames: Arc<Vec<ReplayFrame>>,
}

fn numbers<T: std::str::FromStr>(fields: &str, count: usize, line_no: usize) -> Result<Vec<T>> {
    let values = fields
        .split_whitespace()
        .map(|f| f.parse::<T>())
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|_| RigError::InvalidInput(format!("line {line_no}: bad number in {fields:?}")))?;
    if values.len() != count {
        return Err(RigError::InvalidInput(format!(
            "line {line_no}: expected {count} values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

impl ReplayVision {
    pub fn parse(script: &str) -> Result<Self> {
        let mut frames = Vec::new();
        let (mut width, mut height) = (640u32, 480u32);

        for (i, raw) in script.lines().enumerate() {
            let line_no = i + 1;
            let mut line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut repeat = 1usize;
            if let Some(rest) = line.strip_prefix("repeat ") {
                let (count, body) = rest
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| RigError::InvalidInput(format!("line {line_no}: repeat needs a frame")))?;
                repeat = count
                    .parse()
                    .map_err(|_| RigError::InvalidInput(format!("line {line_no}: bad repeat count {count:?}")))?;
                if repeat > MAX_FRAMES {
                    return Err(RigError::InvalidInput(format!(
                        "line {line_no}: repeat count {repeat} exceeds {MAX_FRAMES}"
                    )));
                }
                line = body.trim();
            }

            let (keyword, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let frame = match keyword {
                "size" => {
                    let dims = numbers::<u32>(args, 2, line_no)?;
                    width = dims[0];
                    height = dims[1];
                    continue;
                }
                "face" => {
                    let faces = args
                        .split(';')
                        .map(|b| numbers::<i32>(b, 4, line_no).map(|v| FaceBox::new(v[0], v[1], v[2], v[3])))
                        .collect::<Result<Vec<_>>>()?;
                    ReplayFrame { width, height, faces, hand: None }
                }
                "hand" => {
                    let v = numbers::<u8>(args, 5, line_no)?;
                    let sample = GestureSample::from_flags([v[0], v[1], v[2], v[3], v[4]]);
                    ReplayFrame { width, height, faces: Vec::new(), hand: Some(sample) }
                }
                "none" => ReplayFrame { width, height, faces: Vec::new(), hand: None },
                other => {
                    return Err(RigError::InvalidInput(format!("line {line_no}: unknown keyword {other:?}")));
                }
            };

            if frames.len() + repeat > MAX_FRAMES {
                return Err(RigError::InvalidInput(format!("line {line_no}: script longer than {MAX_FRAMES} frames")));
            }
            frames.extend(std::iter::repeat(frame).take(repeat));
        }

        Ok(Self { frames: Arc::new(frames) })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let script = std::fs::read_to_string(path)?;
        Self::parse(&script)
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }
}

struct ReplaySource {
    frames: Arc<Vec<ReplayFrame>>,
    next: usize,
    open: bool,
}

impl VideoSource for ReplaySource {
    fn open(&mut self) -> Result<()> {
        self.next = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Frame> {
        if !self.open {
            return None;
        }
        let scripted = self.frames.get(self.next)?;
        let frame = Frame::new(self.next as u64, scripted.width, scripted.height, 0, Vec::new());
        self.next += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.open = false;
    }
}

struct ReplayDetector {
    frames: Arc<Vec<ReplayFrame>>,
    //the hand seen by the last `detect`, handed back by `fingers_up`
    current_hand: Option<GestureSample>,
}

impl ReplayDetector {
    fn scripted(&self, frame: &Frame) -> Option<&ReplayFrame> {
        usize::try_from(frame.index).ok().and_then(|i| self.frames.get(i))
    }
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>> {
        Ok(self.scripted(frame).map(|f| f.faces.clone()).unwrap_or_default())
    }
}

impl HandClassifier for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Landmarks>> {
        self.current_hand = self.scripted(frame).and_then(|f| f.hand);
        Ok(self.current_hand.map(|_| Landmarks::default()))
    }

    fn fingers_up(&mut self, _landmarks: &Landmarks) -> Result<GestureSample> {
        self.current_hand
            .ok_or_else(|| RigError::Detector("fingers_up called without a detected hand".to_string()))
    }
}

impl VisionBackend for ReplayVision {
    fn video_source(&self) -> Result<Box<dyn VideoSource>> {
        Ok(Box::new(ReplaySource {
            frames: Arc::clone(&self.frames),
            next: 0,
            open: false,
        }))
    }

    fn face_detector(&self) -> Result<Box<dyn FaceDetector>> {
        Ok(Box::new(ReplayDetector {
            frames: Arc::clone(&self.frames),
            current_hand: None,
        }))
    }

    fn hand_classifier(&self) -> Result<Box<dyn HandClassifier>> {
        Ok(Box::new(ReplayDetector {
            frames: Arc::clone(&self.frames),
            current_hand: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let vision = ReplayVision::parse(
            "# demo\n\
             size 320 240\n\
             face 10 20 30 40; 1 2 3 4\n\
             repeat 3 hand 0 1 0 0 0\n\
             \n\
             none  # nothing in view\n",
        )
        .unwrap();

        let frames = vision.frames();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].width, 320);
        assert_eq!(frames[0].faces, vec![FaceBox::new(10, 20, 30, 40), FaceBox::new(1, 2, 3, 4)]);
        assert_eq!(frames[3].hand, Some(GestureSample::from_flags([0, 1, 0, 0, 0])));
        assert_eq!(frames[4], ReplayFrame { width: 320, height: 240, faces: vec![], hand: None });
    }

    #[test]
    fn test_parse_errors() {
        assert!(ReplayVision::parse("face 1 2 3").is_err());
        assert!(ReplayVision::parse("hand 0 1 x 0 0").is_err());
        assert!(ReplayVision::parse("wave").is_err());
        assert!(ReplayVision::parse("repeat many none").is_err());
    }

    #[test]
    fn test_repeat_is_capped() {
        assert!(matches!(ReplayVision::parse("repeat 99999999999 none"), Err(RigError::InvalidInput(_))));
        assert!(ReplayVision::parse("repeat 600000 none\nrepeat 600000 none").is_err());
        assert_eq!(ReplayVision::parse("repeat 1000 none").unwrap().frames().len(), 1000);
    }

    #[test]
    fn test_source_ends_with_script() {
        let vision = ReplayVision::parse("none\nnone").unwrap();
        let mut source = vision.video_source().unwrap();
        assert!(source.read_frame().is_none());

        source.open().unwrap();
        assert_eq!(source.read_frame().map(|f| f.index), Some(0));
        assert_eq!(source.read_frame().map(|f| f.index), Some(1));
        assert!(source.read_frame().is_none());
    }

    #[test]
    fn test_detectors_follow_frame_index() {
        let vision = ReplayVision::parse("face 300 200 40 40\nhand 0 1 1 0 0\nnone").unwrap();
        let mut faces = vision.face_detector().unwrap();
        let mut hands = vision.hand_classifier().unwrap();

        let f0 = Frame::new(0, 640, 480, 0, Vec::new());
        let f1 = Frame::new(1, 640, 480, 0, Vec::new());
        let f2 = Frame::new(2, 640, 480, 0, Vec::new());

        assert_eq!(faces.detect(&f0).unwrap().len(), 1);
        assert!(faces.detect(&f1).unwrap().is_empty());
        assert_eq!(hands.classify(&f1).unwrap(), Some(GestureSample::from_flags([0, 1, 1, 0, 0])));
        assert_eq!(hands.classify(&f2).unwrap(), None);
    }
}
