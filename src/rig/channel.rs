/**
 * Motor Command Channel
 *
 * Owns the serial link and the position state. Moves and mode
 * announcements are fire-and-forget writes; reset is the one call that
 * waits for the firmware to answer.
 *
 * The link is held as two handles. Writes go through `writer`; reset
 * waits on `reader`, so moves keep flowing while a reset is pending.
 * Lock order is reader, writer, position. Holding the writer while the
 * pose is updated keeps the wire order and the pose history in step.
 */

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Result, RigError};
use crate::lock;
use crate::uart::{parse_init_response, SerialLink, WireCommand};
use super::command::MotorCommand;
use super::mode::TrackingMode;
use super::pose::{Pose, PoseLimits, PositionState};

pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct MotorChannel {
    writer: Mutex<Box<dyn SerialLink>>,
    reader: Mutex<Box<dyn SerialLink>>,
    position: Mutex<PositionState>,
    reset_timeout: Duration,
}

impl MotorChannel {
    pub fn new(link: Box<dyn SerialLink>, position: PositionState, reset_timeout: Duration) -> Result<Self> {
        let reader = link.try_clone()?;
        Ok(Self {
            writer: Mutex::new(link),
            reader: Mutex::new(reader),
            position: Mutex::new(position),
            reset_timeout,
        })
    }

    /// Send a relative move and apply it to the pose. The pose is left
    /// alone when the write fails.
    pub fn send_delta(&self, cmd: MotorCommand) -> Result<Pose> {
        let mut writer = lock(&self.writer);
        writer.send(&WireCommand::Move(cmd).encode())?;

        let pose = lock(&self.position).apply_delta(cmd);
        debug!("move {},{} -> {}", cmd.dh, cmd.dv, pose);
        Ok(pose)
    }

    pub fn announce_mode(&self, mode: TrackingMode) -> Result<()> {
        lock(&self.writer).send(&WireCommand::Mode(mode).encode())?;
        debug!("announced mode {:?}", mode.announcement());
        Ok(())
    }

    /// Ask the firmware for its real pose and adopt it. Blocks up to the
    /// reset timeout; on any failure the pose is unchanged.
    pub fn reset(&self) -> Result<Pose> {
        //one reset at a time; writers are only blocked for the RESET write
        let mut reader = lock(&self.reader);
        reader.discard_input()?;
        lock(&self.writer).send(&WireCommand::Reset.encode())?;

        let line = match reader.receive_line(self.reset_timeout)? {
            Some(line) => line,
            None => {
                warn!("no reset response within {:?}", self.reset_timeout);
                return Err(RigError::ResetTimeout);
            }
        };

        let mut position = lock(&self.position);
        let pose = parse_init_response(&line, &position.limits())?;
        let pose = position.adopt(pose)?;
        info!("reset adopted {}", pose);
        Ok(pose)
    }

    pub fn pose(&self) -> Pose {
        lock(&self.position).pose()
    }

    pub fn limits(&self) -> PoseLimits {
        lock(&self.position).limits()
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }
}
