/**
 * Pan/Tilt Rig Module
 *
 * Control engine for the two-axis camera rig:
 * - Mode controller (face / gesture / manual tracking sessions)
 * - Tracking task (frame loop on a worker thread)
 * - Face proportional mapper and gesture debouncer
 * - Motor command channel owning the pose and the serial link
 */

pub mod channel;
pub mod command;
pub mod controller;
pub mod face;
pub mod gesture;
pub mod mode;
pub mod pose;
pub mod tracking;

pub use channel::MotorChannel;
pub use command::{Direction, MotorCommand};
pub use controller::ModeController;
pub use face::{FaceBox, FaceMapper};
pub use gesture::{GestureDebouncer, GestureSample};
pub use mode::TrackingMode;
pub use pose::{AxisLimits, Pose, PoseLimits, PositionState};
pub use tracking::{TaskExit, TrackingSettings, TrackingTask};
