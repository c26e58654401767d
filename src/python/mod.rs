use pyo3::prelude::*;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyTimeoutError, PyValueError};
use pyo3::types::PyBytes;
use std::sync::Arc;
use log::warn;

use crate::config::Config;
use crate::error::{Result, RigError};
use crate::rig::{Direction, FaceBox, GestureSample, ModeController, MotorChannel, PositionState, TrackingMode};
use crate::status::StatusBoard;
use crate::uart::{MemoryLink, SerialLink, SerialPortLink};
use crate::vision::{FaceDetector, Frame, HandClassifier, Landmarks, VideoSource, VisionBackend};

impl From<RigError> for PyErr{
    fn from(err: RigError) -> PyErr{
        match err{
            RigError::InvalidInput(_) | RigError::ConfigError(_) | RigError::MalformedReset(_) =>{
                PyValueError::new_err(err.to_string())
            }
            RigError::ResetTimeout => PyTimeoutError::new_err(err.to_string()),
            RigError::Serial(_) | RigError::Io(_) | RigError::Transport(_) => PyIOError::new_err(err.to_string()),
            RigError::Video(_) | RigError::Detector(_) => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

fn detector_error(err: PyErr) -> RigError{
    RigError::Detector(err.to_string())
}

fn sample_from_flags(flags: Vec<u8>) -> Result<GestureSample>{
    let flags: [u8; 5] = flags
        .try_into()
        .map_err(|f: Vec<u8>| RigError::Detector(format!("expected 5 finger flags, got {}", f.len())))?;
    Ok(GestureSample::from_flags(flags))
}

//camera object with open() / read() -> (w, h, channels, bytes) | None / release()
struct PyCamera{
    camera: PyObject,
    next_index: u64,
}

impl VideoSource for PyCamera{
    fn open(&mut self) -> Result<()>{
        self.next_index = 0;
        Python::with_gil(|py| self.camera.call_method0(py, "open").map(|_| ()))
            .map_err(|e| RigError::Video(e.to_string()))
    }

    fn read_frame(&mut self) -> Option<Frame>{
        let index = self.next_index;
        let read = Python::with_gil(|py| -> PyResult<Option<Frame>>{
            let result = self.camera.call_method0(py, "read")?;
            if result.is_none(py){
                return Ok(None);
            }
            let (width, height, channels, pixels): (u32, u32, u8, &PyBytes) = result.extract(py)?;
            Ok(Some(Frame::new(index, width, height, channels, pixels.as_bytes().to_vec())))
        });

        match read{
            Ok(frame) =>{
                self.next_index += 1;
                frame
            }
            Err(e) =>{
                warn!("camera read failed: {}", e);
                None
            }
        }
    }

    fn release(&mut self){
        if let Err(e) = Python::with_gil(|py| self.camera.call_method0(py, "release").map(|_| ())){
            warn!("camera release failed: {}", e);
        }
    }
}

//face_detector(w, h, channels, bytes) -> [(x, y, w, h), ...]
struct PyFaceDetector{
    detect: PyObject,
}

impl FaceDetector for PyFaceDetector{
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>>{
        Python::with_gil(|py| -> PyResult<Vec<FaceBox>>{
            let pixels = PyBytes::new(py, &frame.pixels);
            let result = self.detect.call1(py, (frame.width, frame.height, frame.channels, pixels))?;
            let boxes: Vec<(i32, i32, i32, i32)> = result.extract(py)?;
            Ok(boxes.into_iter().map(|(x, y, w, h)| FaceBox::new(x, y, w, h)).collect())
        })
        .map_err(detector_error)
    }
}

//hand_detector(w, h, channels, bytes) -> [(x, y, z), ...] | None
//fingers_up(landmarks) -> [thumb, index, middle, ring, pinky]
struct PyHandClassifier{
    detect: PyObject,
    fingers_up: PyObject,
}

impl HandClassifier for PyHandClassifier{
    fn detect(&mut self, frame: &Frame) -> Result<Option<Landmarks>>{
        Python::with_gil(|py| -> PyResult<Option<Landmarks>>{
            let pixels = PyBytes::new(py, &frame.pixels);
            let result = self.detect.call1(py, (frame.width, frame.height, frame.channels, pixels))?;
            if result.is_none(py){
                return Ok(None);
            }
            let points: Vec<(f32, f32, f32)> = result.extract(py)?;
            Ok(Some(Landmarks{ points: points.into_iter().map(|(x, y, z)| [x, y, z]).collect() }))
        })
        .map_err(detector_error)
    }

    fn fingers_up(&mut self, landmarks: &Landmarks) -> Result<GestureSample>{
        let points: Vec<(f32, f32, f32)> = landmarks.points.iter().map(|p| (p[0], p[1], p[2])).collect();
        let flags = Python::with_gil(|py|{
            let result = self.fingers_up.call1(py, (points,))?;
            result.extract::<Vec<u8>>(py)
        })
        .map_err(detector_error)?;
        sample_from_flags(flags)
    }
}

struct PyVision{
    camera: PyObject,
    face_detector: PyObject,
    hand_detector: PyObject,
    fingers_up: PyObject,
}

impl VisionBackend for PyVision{
    fn video_source(&self) -> Result<Box<dyn VideoSource>>{
        let camera = Python::with_gil(|py| self.camera.clone_ref(py));
        Ok(Box::new(PyCamera{ camera, next_index: 0 }))
    }

    fn face_detector(&self) -> Result<Box<dyn FaceDetector>>{
        let detect = Python::with_gil(|py| self.face_detector.clone_ref(py));
        Ok(Box::new(PyFaceDetector{ detect }))
    }

    fn hand_classifier(&self) -> Result<Box<dyn HandClassifier>>{
        let (detect, fingers_up) = Python::with_gil(|py|{
            (self.hand_detector.clone_ref(py), self.fingers_up.clone_ref(py))
        });
        Ok(Box::new(PyHandClassifier{ detect, fingers_up }))
    }
}

#[pyclass(name = "PanTiltRig")]
pub struct PyPanTiltRig{
    inner: Arc<ModeController>,
    board: Arc<StatusBoard>,
}

impl PyPanTiltRig{
    fn build(link: Box<dyn SerialLink>, vision: PyVision, config: &Config) -> Result<Self>{
        let channel = MotorChannel::new(
            link,
            PositionState::new(config.pose_limits(), config.home()),
            config.reset_timeout(),
        )?;
        let board = Arc::new(StatusBoard::new());
        let inner = ModeController::new(channel, Arc::new(vision), board.clone(), config.tracking_settings());
        Ok(PyPanTiltRig{ inner: Arc::new(inner), board })
    }
}

#[pymethods]
impl PyPanTiltRig{
    #[new]
    #[pyo3(signature = (port, camera, face_detector, hand_detector, fingers_up, baud_rate=9600, config_path=None, dry_run=false))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        port: &str,
        camera: PyObject,
        face_detector: PyObject,
        hand_detector: PyObject,
        fingers_up: PyObject,
        baud_rate: u32,
        config_path: Option<&str>,
        dry_run: bool,
    ) -> PyResult<Self>{
        let mut config = match config_path{
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.serial.port = port.to_string();
        config.serial.baud_rate = baud_rate;
        config.validate()?;

        let link: Box<dyn SerialLink> = if dry_run{
            let link = MemoryLink::new();
            link.answer_resets_with(config.home());
            Box::new(link)
        }else{
            Box::new(SerialPortLink::open(&config.serial.port, config.serial.baud_rate, config.write_timeout())?)
        };

        let vision = PyVision{ camera, face_detector, hand_detector, fingers_up };
        Ok(Self::build(link, vision, &config)?)
    }

    /// Start "face", "gesture" or "manual". False if a session is already running.
    fn start(&self, py: Python<'_>, mode: &str) -> PyResult<bool>{
        let mode: TrackingMode = mode.parse()?;
        let ctrl = Arc::clone(&self.inner);
        Ok(py.allow_threads(move || ctrl.start(mode))?)
    }

    fn stop(&self, py: Python<'_>) -> PyResult<bool>{
        let ctrl = Arc::clone(&self.inner);
        Ok(py.allow_threads(move || ctrl.stop())?)
    }

    /// Jog "up", "down", "left" or "right"; returns the new (h, v).
    fn jog(&self, py: Python<'_>, direction: &str) -> PyResult<(i32, i32)>{
        let direction: Direction = direction.parse()?;
        let ctrl = Arc::clone(&self.inner);
        let pose = py.allow_threads(move || ctrl.jog(direction))?;
        Ok((pose.horizontal, pose.vertical))
    }

    /// Blocking reset handshake; returns the adopted (h, v).
    fn reset(&self, py: Python<'_>) -> PyResult<(i32, i32)>{
        let ctrl = Arc::clone(&self.inner);
        let pose = py.allow_threads(move || ctrl.reset())?;
        Ok((pose.horizontal, pose.vertical))
    }

    fn pose(&self) -> (i32, i32){
        let pose = self.inner.pose();
        (pose.horizontal, pose.vertical)
    }

    fn mode(&self) -> String{
        self.inner.mode().to_string()
    }

    /// (text, colour, epoch) of the latest status
    fn status(&self) -> (String, String, u64){
        let (status, epoch) = self.board.latest();
        (status.text, status.severity.color().to_string(), epoch)
    }

    fn shutdown(&self, py: Python<'_>) -> PyResult<()>{
        let ctrl = Arc::clone(&self.inner);
        Ok(py.allow_threads(move || ctrl.shutdown())?)
    }
}

#[pymodule]
fn pantilt(_py: Python, m: &PyModule) -> PyResult<()>{
    m.add_class::<PyPanTiltRig>()?;
    Ok(())
}
