/**
 * Mode Controller
 *
 * Top-level state machine for the rig:
 * 1. Starts at most one tracking session at a time (double start is a no-op)
 * 2. Announces every mode change to the firmware
 * 3. Returns to Idle on stop or when the session's task exits
 * 4. Routes manual jogs and resets straight to the motor channel
 *
 * Each session carries an id. A task that exits after its session was
 * stopped or replaced finds a different id and leaves the state alone.
 * Mode-change statuses are posted under the session lock so the last
 * status always matches the current mode.
 */

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use log::{debug, error, info, warn};

use crate::error::{Result, RigError};
use crate::lock;
use crate::status::{Status, StatusSink};
use crate::vision::VisionBackend;
use super::channel::MotorChannel;
use super::command::Direction;
use super::mode::TrackingMode;
use super::pose::Pose;
use super::tracking::{TaskExit, TrackingSettings, TrackingTask};

//a reply that starts like an INIT response but does not parse
const INIT_TAG: &str = "INIT";

struct Session {
    mode: TrackingMode,
    id: u64,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    //workers from stopped sessions that have not been joined yet
    retired: Vec<JoinHandle<()>>,
}

struct Shared {
    channel: Arc<MotorChannel>,
    vision: Arc<dyn VisionBackend>,
    status: Arc<dyn StatusSink>,
    settings: TrackingSettings,
    session: Mutex<Session>,
}

impl Shared {
    //called on the worker thread once its task is done
    fn finish(&self, id: u64, mode: TrackingMode, exit: TaskExit) {
        let mut session = lock(&self.session);
        if session.id != id {
            debug!("[{}] session {} already closed", mode, id);
            return;
        }

        session.mode = TrackingMode::Idle;
        session.id += 1;
        if let Err(e) = self.channel.announce_mode(TrackingMode::Idle) {
            warn!("could not announce idle after {} ended: {}", mode, e);
        }

        let status = match exit {
            TaskExit::Cancelled | TaskExit::SourceEnded => Status::error(mode.inactive_status()),
            TaskExit::SourceUnavailable(e) => {
                error!("[{}] {}", mode, e);
                Status::error(format!("Video Source Error: {e}"))
            }
            TaskExit::Transport(e) => {
                error!("[{}] {}", mode, e);
                Status::error(format!("Serial Error: {e}"))
            }
        };
        self.status.set_status(status);
    }

    fn serial_error(&self, e: &RigError) {
        error!("{}", e);
        self.status.set_status(Status::error(format!("Serial Error: {e}")));
    }
}

pub struct ModeController {
    shared: Arc<Shared>,
}

impl ModeController {
    pub fn new(
        channel: MotorChannel,
        vision: Arc<dyn VisionBackend>,
        status: Arc<dyn StatusSink>,
        settings: TrackingSettings,
    ) -> Self {
        status.set_status(Status::info("Idle"));
        Self {
            shared: Arc::new(Shared {
                channel: Arc::new(channel),
                vision,
                status,
                settings,
                session: Mutex::new(Session {
                    mode: TrackingMode::Idle,
                    id: 0,
                    cancel: Arc::new(AtomicBool::new(false)),
                    worker: None,
                    retired: Vec::new(),
                }),
            }),
        }
    }

    /// Start a tracking session. Returns `Ok(false)` without doing anything
    /// when a session is already running.
    pub fn start(&self, mode: TrackingMode) -> Result<bool> {
        if mode.is_idle() {
            return Err(RigError::InvalidInput("idle is entered with stop".to_string()));
        }

        let (id, cancel, previous) = {
            let mut session = lock(&self.shared.session);
            if !session.mode.is_idle() {
                debug!("start {} ignored, {} is running", mode, session.mode);
                return Ok(false);
            }

            if let Err(e) = self.shared.channel.announce_mode(mode) {
                self.shared.serial_error(&e);
                return Err(e);
            }

            session.mode = mode;
            session.id += 1;
            session.cancel = Arc::new(AtomicBool::new(false));
            let mut previous: Vec<JoinHandle<()>> = session.retired.drain(..).collect();
            previous.extend(session.worker.take());
            self.shared.status.set_status(Status::active(mode.active_status()));
            (session.id, Arc::clone(&session.cancel), previous)
        };

        info!("[{}] session {} started", mode, id);

        //a stopped task may still be finishing its last frame
        for handle in previous {
            if handle.join().is_err() {
                error!("previous tracking worker panicked");
            }
        }

        let task = TrackingTask::new(
            mode,
            cancel,
            Arc::clone(&self.shared.channel),
            Arc::clone(&self.shared.vision),
            self.shared.settings,
        );
        let shared = Arc::clone(&self.shared);
        let worker = task.spawn(move |exit| shared.finish(id, mode, exit));

        let mut session = lock(&self.shared.session);
        if session.id == id {
            session.worker = Some(worker);
        } else {
            session.retired.push(worker);
        }
        Ok(true)
    }

    /// Cancel the running session and go Idle. Returns `Ok(false)` when
    /// already idle. The worker winds down in the background.
    pub fn stop(&self) -> Result<bool> {
        let mut session = lock(&self.shared.session);
        if session.mode.is_idle() {
            return Ok(false);
        }

        session.cancel.store(true, Ordering::SeqCst);
        let mode = session.mode;
        session.mode = TrackingMode::Idle;
        session.id += 1;
        let announced = self.shared.channel.announce_mode(TrackingMode::Idle);
        self.shared.status.set_status(Status::error("Tracking Stopped"));
        if let Err(e) = &announced {
            self.shared.serial_error(e);
        }
        drop(session);

        info!("[{}] stopped", mode);
        announced.map(|_| true)
    }

    /// Jog by one manual step. Allowed in every mode.
    pub fn jog(&self, direction: Direction) -> Result<Pose> {
        let cmd = direction.delta(self.shared.settings.manual_step);
        match self.shared.channel.send_delta(cmd) {
            Ok(pose) => {
                self.shared.status.set_status(Status::active(format!("Manual Control: {pose}")));
                Ok(pose)
            }
            Err(e) => {
                self.shared.serial_error(&e);
                Err(e)
            }
        }
    }

    /// Run the reset handshake. Blocks for up to the reset timeout, so
    /// UI threads should call this from a helper thread.
    pub fn reset(&self) -> Result<Pose> {
        let result = self.shared.channel.reset();
        let status = match &result {
            Ok(_) => Status::info("Motors Reset to Initial Positions"),
            Err(RigError::MalformedReset(line)) if line.trim_start().starts_with(INIT_TAG) => {
                Status::error("Error in Reset Response")
            }
            Err(RigError::MalformedReset(_)) | Err(RigError::ResetTimeout) => Status::error("Reset Failed"),
            Err(e) => Status::error(format!("Serial Error: {e}")),
        };
        if let Err(e) = &result {
            warn!("reset failed: {}", e);
        }
        self.shared.status.set_status(status);
        result
    }

    pub fn mode(&self) -> TrackingMode {
        lock(&self.shared.session).mode
    }

    pub fn pose(&self) -> Pose {
        self.shared.channel.pose()
    }

    pub fn settings(&self) -> &TrackingSettings {
        &self.shared.settings
    }

    /// Stop and wait for every worker thread to exit.
    pub fn shutdown(&self) -> Result<()> {
        let stopped = self.stop();

        let workers: Vec<JoinHandle<()>> = {
            let mut session = lock(&self.shared.session);
            let mut workers: Vec<JoinHandle<()>> = session.retired.drain(..).collect();
            workers.extend(session.worker.take());
            workers
        };
        for handle in workers {
            if handle.join().is_err() {
                error!("tracking worker panicked");
            }
        }

        info!("shutdown complete");
        stopped.map(|_| ())
    }
}
