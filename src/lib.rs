pub mod config;
pub mod error;
pub mod rig;
pub mod status;
pub mod uart;
pub mod vision;

#[cfg(feature = "python")]
pub mod python;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::Config;
pub use error::{Result, RigError};
pub use rig::{
    Direction, ModeController, MotorChannel, MotorCommand,
    Pose, PoseLimits, PositionState, TrackingMode, TrackingSettings,
};
pub use status::{Severity, Status, StatusBoard, StatusSink};
pub use uart::{MemoryLink, SerialLink, SerialPortLink};
pub use vision::{NoVision, ReplayVision, VisionBackend};

//guarded values are only ever replaced whole, so a poisoned lock is still consistent
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T>{
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
