/**
 * Tracking Task
 *
 * One worker thread per tracking session:
 * 1. Pulls a frame from the video source (end of stream stops the task)
 * 2. Runs the mode's detector on it
 * 3. Maps the result to a move via the face mapper or gesture debouncer
 * 4. Sends the move through the motor channel
 *
 * Cancellation is cooperative. The flag is checked once per frame, so a
 * stop takes effect within one capture + inference + poll interval.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Result, RigError};
use crate::vision::{FaceDetector, Frame, HandClassifier, VisionBackend};
use super::channel::MotorChannel;
use super::face::{FaceMapper, DEFAULT_GAIN};
use super::gesture::{GestureDebouncer, DEFAULT_STEP, DEFAULT_THRESHOLD};
use super::mode::TrackingMode;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const HOLD_POLL: Duration = Duration::from_millis(10);

/// Tunables shared by all tracking sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    pub face_gain_x: i32,
    pub face_gain_y: i32,
    pub gesture_threshold: u32,
    pub gesture_step: i32,
    /// Mirror frames before hand classification
    pub mirror_gestures: bool,
    pub manual_step: i32,
    /// Pause between frames
    pub poll_interval: Duration,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            face_gain_x: DEFAULT_GAIN,
            face_gain_y: DEFAULT_GAIN,
            gesture_threshold: DEFAULT_THRESHOLD,
            gesture_step: DEFAULT_STEP,
            mirror_gestures: true,
            manual_step: DEFAULT_STEP,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Why a tracking task ended
#[derive(Debug)]
pub enum TaskExit {
    Cancelled,
    SourceEnded,
    SourceUnavailable(RigError),
    Transport(RigError),
}

enum Pipeline {
    Face {
        detector: Box<dyn FaceDetector>,
        mapper: FaceMapper,
    },
    Gesture {
        classifier: Box<dyn HandClassifier>,
        debouncer: GestureDebouncer,
        mirror: bool,
    },
}

pub struct TrackingTask {
    mode: TrackingMode,
    cancel: Arc<AtomicBool>,
    channel: Arc<MotorChannel>,
    vision: Arc<dyn VisionBackend>,
    settings: TrackingSettings,
}

impl TrackingTask {
    pub fn new(
        mode: TrackingMode,
        cancel: Arc<AtomicBool>,
        channel: Arc<MotorChannel>,
        vision: Arc<dyn VisionBackend>,
        settings: TrackingSettings,
    ) -> Self {
        Self { mode, cancel, channel, vision, settings }
    }

    /// Run on a worker thread; `on_exit` is called from that thread.
    pub fn spawn<F>(self, on_exit: F) -> JoinHandle<()>
    where
        F: FnOnce(TaskExit) + Send + 'static,
    {
        thread::spawn(move || {
            let exit = self.run();
            on_exit(exit);
        })
    }

    pub fn run(&self) -> TaskExit {
        info!("[{}] tracking task running", self.mode);
        let exit = match self.mode {
            TrackingMode::Face | TrackingMode::Gesture => self.track(),
            //manual jogs bypass the task, it only keeps the session alive
            TrackingMode::Manual => self.hold(),
            TrackingMode::Idle => TaskExit::Cancelled,
        };
        info!("[{}] tracking task finished: {:?}", self.mode, exit);
        exit
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn hold(&self) -> TaskExit {
        while !self.cancelled() {
            thread::sleep(self.settings.poll_interval.max(HOLD_POLL));
        }
        TaskExit::Cancelled
    }

    fn pipeline(&self) -> Result<Pipeline> {
        let s = &self.settings;
        match self.mode {
            TrackingMode::Gesture => Ok(Pipeline::Gesture {
                classifier: self.vision.hand_classifier()?,
                debouncer: GestureDebouncer::new(s.gesture_threshold, s.gesture_step),
                mirror: s.mirror_gestures,
            }),
            _ => Ok(Pipeline::Face {
                detector: self.vision.face_detector()?,
                mapper: FaceMapper::new(s.face_gain_x, s.face_gain_y),
            }),
        }
    }

    fn track(&self) -> TaskExit {
        let mut source = match self.vision.video_source() {
            Ok(source) => source,
            Err(e) => return TaskExit::SourceUnavailable(e),
        };
        if let Err(e) = source.open() {
            return TaskExit::SourceUnavailable(e);
        }

        let mut pipeline = match self.pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                source.release();
                return TaskExit::SourceUnavailable(e);
            }
        };

        let exit = loop {
            if self.cancelled() {
                break TaskExit::Cancelled;
            }

            let mut frame = match source.read_frame() {
                Some(frame) => frame,
                None => break TaskExit::SourceEnded,
            };

            if let Err(e) = self.process(&mut pipeline, &mut frame) {
                break TaskExit::Transport(e);
            }

            if self.cancelled() {
                break TaskExit::Cancelled;
            }
            if !self.settings.poll_interval.is_zero() {
                thread::sleep(self.settings.poll_interval);
            }
        };

        source.release();
        exit
    }

    //detector failures only cost the frame; link failures end the task
    fn process(&self, pipeline: &mut Pipeline, frame: &mut Frame) -> Result<()> {
        let cmd = match pipeline {
            Pipeline::Face { detector, mapper } => match detector.detect(frame) {
                Ok(faces) => mapper.map(&faces, frame.width, frame.height),
                Err(e) => {
                    warn!("face detector failed on frame {}: {}", frame.index, e);
                    None
                }
            },
            Pipeline::Gesture { classifier, debouncer, mirror } => {
                if *mirror {
                    frame.mirror_horizontal();
                }
                match classifier.classify(frame) {
                    Ok(Some(sample)) => debouncer.observe(sample),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("hand classifier failed on frame {}: {}", frame.index, e);
                        None
                    }
                }
            }
        };

        if let Some(cmd) = cmd {
            let pose = self.channel.send_delta(cmd)?;
            debug!("[{}] frame {} -> {}", self.mode, frame.index, pose);
        }
        Ok(())
    }
}
