//! End-to-end sessions over an in-memory link and scripted vision.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pantilt::rig::channel::DEFAULT_RESET_TIMEOUT;
use pantilt::{
    Direction, MemoryLink, ModeController, MotorChannel, NoVision, Pose, PositionState,
    ReplayVision, RigError, SerialLink, Status, StatusSink, TrackingMode, TrackingSettings,
    VisionBackend,
};

#[derive(Default)]
struct Recorder {
    history: Mutex<Vec<Status>>,
}

impl Recorder {
    fn texts(&self) -> Vec<String> {
        self.history.lock().unwrap().iter().map(|s| s.text.clone()).collect()
    }

    fn last(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }
}

impl StatusSink for Recorder {
    fn set_status(&self, status: Status) {
        self.history.lock().unwrap().push(status);
    }
}

struct Rig {
    controller: Arc<ModeController>,
    wire: MemoryLink,
    status: Arc<Recorder>,
}

//link that only hands over a reply once the whole timeout has passed
#[derive(Clone)]
struct SlowReplyLink {
    wire: MemoryLink,
}

impl SerialLink for SlowReplyLink {
    fn send(&mut self, bytes: &[u8]) -> pantilt::Result<()> {
        self.wire.send(bytes)
    }

    fn receive_line(&mut self, timeout: Duration) -> pantilt::Result<Option<String>> {
        thread::sleep(timeout);
        self.wire.receive_line(timeout)
    }

    fn try_clone(&self) -> pantilt::Result<Box<dyn SerialLink>> {
        Ok(Box::new(self.clone()))
    }
}

fn build_rig(
    link: Box<dyn SerialLink>,
    wire: MemoryLink,
    vision: Arc<dyn VisionBackend>,
    poll_interval: Duration,
    reset_timeout: Duration,
) -> Rig {
    let channel = MotorChannel::new(link, PositionState::default(), reset_timeout).unwrap();
    let status = Arc::new(Recorder::default());
    let settings = TrackingSettings { poll_interval, ..Default::default() };
    let controller = ModeController::new(channel, vision, status.clone(), settings);
    Rig { controller: Arc::new(controller), wire, status }
}

fn rig_with(vision: Arc<dyn VisionBackend>, poll_interval: Duration) -> Rig {
    let wire = MemoryLink::new();
    build_rig(Box::new(wire.clone()), wire, vision, poll_interval, DEFAULT_RESET_TIMEOUT)
}

fn replay(script: &str) -> Arc<dyn VisionBackend> {
    Arc::new(ReplayVision::parse(script).unwrap())
}

//a session that keeps running until stopped
fn endless() -> Arc<dyn VisionBackend> {
    replay("repeat 100000 none")
}

fn wait_until<F: Fn() -> bool>(what: &str, check: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_initial_status_is_idle() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);
    assert_eq!(rig.status.texts(), vec!["Idle"]);
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert!(rig.wire.written().is_empty());
}

#[test]
fn test_gesture_session_runs_to_end_of_source() {
    let rig = rig_with(replay("repeat 8 hand 0 1 0 0 0"), Duration::ZERO);
    assert!(rig.controller.start(TrackingMode::Gesture).unwrap());

    wait_until("gesture session to end", || rig.status.last() == "Gesture Tracking: Inactive");
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert_eq!(rig.controller.pose(), Pose::new(81, 90));
    assert_eq!(rig.wire.lines(), vec!["MODE:Gesture Tracking Mode", "-9,0", "MODE:Idle"]);
    assert_eq!(rig.status.texts(), vec!["Idle", "Gesture Tracking: Active", "Gesture Tracking: Inactive"]);
    rig.controller.shutdown().unwrap();
}

#[test]
fn test_face_session_moves_towards_face() {
    let rig = rig_with(replay("face 300 200 40 40\nface 580 20 40 40"), Duration::ZERO);
    assert!(rig.controller.start(TrackingMode::Face).unwrap());

    wait_until("face session to end", || rig.status.last() == "Face Tracking: Inactive");
    assert_eq!(rig.wire.lines(), vec!["MODE:Face Tracking Mode", "0,1", "14,10", "MODE:Idle"]);
    assert_eq!(rig.controller.pose(), Pose::new(104, 101));
}

#[test]
fn test_second_start_is_ignored() {
    let rig = rig_with(endless(), Duration::from_millis(1));
    assert!(rig.controller.start(TrackingMode::Face).unwrap());
    assert!(!rig.controller.start(TrackingMode::Gesture).unwrap());
    assert!(!rig.controller.start(TrackingMode::Face).unwrap());
    assert_eq!(rig.controller.mode(), TrackingMode::Face);

    rig.controller.shutdown().unwrap();
    let announced: Vec<String> = rig.wire.lines().into_iter().filter(|l| l.starts_with("MODE:")).collect();
    assert_eq!(announced, vec!["MODE:Face Tracking Mode", "MODE:Idle"]);
}

#[test]
fn test_concurrent_starts_admit_one_session() {
    let rig = rig_with(endless(), Duration::from_millis(1));
    let barrier = Arc::new(Barrier::new(4));
    let modes = [TrackingMode::Face, TrackingMode::Gesture, TrackingMode::Manual, TrackingMode::Face];

    let handles: Vec<_> = modes
        .into_iter()
        .map(|mode| {
            let controller = Arc::clone(&rig.controller);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                controller.start(mode).unwrap()
            })
        })
        .collect();

    let started = handles.into_iter().map(|h| h.join().unwrap()).filter(|&s| s).count();
    assert_eq!(started, 1);
    assert!(!rig.controller.mode().is_idle());
    rig.controller.shutdown().unwrap();
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
}

#[test]
fn test_stop_goes_idle_once() {
    let rig = rig_with(endless(), Duration::from_millis(1));
    assert!(rig.controller.start(TrackingMode::Face).unwrap());
    thread::sleep(Duration::from_millis(10));

    assert!(rig.controller.stop().unwrap());
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert_eq!(rig.status.last(), "Tracking Stopped");
    assert!(!rig.controller.stop().unwrap());

    //the cancelled task must not announce or report anything on its way out
    rig.controller.shutdown().unwrap();
    assert_eq!(rig.wire.lines(), vec!["MODE:Face Tracking Mode", "MODE:Idle"]);
    assert_eq!(rig.status.last(), "Tracking Stopped");
}

#[test]
fn test_stop_racing_start_leaves_stopped_status() {
    for _ in 0..200 {
        let rig = rig_with(endless(), Duration::from_millis(1));
        let ctrl = Arc::clone(&rig.controller);
        let stopper = thread::spawn(move || while !ctrl.stop().unwrap() {});

        assert!(rig.controller.start(TrackingMode::Face).unwrap());
        stopper.join().unwrap();
        rig.controller.shutdown().unwrap();

        assert_eq!(rig.controller.mode(), TrackingMode::Idle);
        assert_eq!(rig.status.last(), "Tracking Stopped");
    }
}

#[test]
fn test_restart_after_stop() {
    let rig = rig_with(endless(), Duration::from_millis(1));
    assert!(rig.controller.start(TrackingMode::Face).unwrap());
    assert!(rig.controller.stop().unwrap());
    assert!(rig.controller.start(TrackingMode::Gesture).unwrap());
    assert_eq!(rig.controller.mode(), TrackingMode::Gesture);

    rig.controller.shutdown().unwrap();
    assert_eq!(
        rig.wire.lines(),
        vec!["MODE:Face Tracking Mode", "MODE:Idle", "MODE:Gesture Tracking Mode", "MODE:Idle"]
    );
}

#[test]
fn test_manual_session_holds_until_stopped() {
    let rig = rig_with(Arc::new(NoVision), Duration::from_millis(1));
    assert!(rig.controller.start(TrackingMode::Manual).unwrap());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(rig.controller.mode(), TrackingMode::Manual);
    assert_eq!(rig.status.last(), "Manual Tracking Mode: Active");
    rig.controller.shutdown().unwrap();
}

#[test]
fn test_missing_camera_reports_video_error() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);
    assert!(rig.controller.start(TrackingMode::Face).unwrap());

    wait_until("video error", || rig.status.last().starts_with("Video Source Error"));
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert_eq!(rig.wire.lines(), vec!["MODE:Face Tracking Mode", "MODE:Idle"]);
}

#[test]
fn test_failed_announce_keeps_idle() {
    let rig = rig_with(endless(), Duration::ZERO);
    rig.wire.set_fail_writes(true);

    assert!(matches!(rig.controller.start(TrackingMode::Face), Err(RigError::Transport(_))));
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert!(rig.status.last().starts_with("Serial Error"));

    rig.wire.set_fail_writes(false);
    assert!(rig.controller.start(TrackingMode::Face).unwrap());
    rig.controller.shutdown().unwrap();
}

#[test]
fn test_start_idle_is_rejected() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);
    assert!(matches!(rig.controller.start(TrackingMode::Idle), Err(RigError::InvalidInput(_))));
}

#[test]
fn test_jog_in_idle_and_during_tracking() {
    let rig = rig_with(endless(), Duration::from_millis(1));
    assert_eq!(rig.controller.jog(Direction::Left).unwrap(), Pose::new(81, 90));
    assert_eq!(rig.status.last(), "Manual Control: H=81°, V=90°");

    assert!(rig.controller.start(TrackingMode::Face).unwrap());
    assert_eq!(rig.controller.jog(Direction::Up).unwrap(), Pose::new(81, 99));
    rig.controller.shutdown().unwrap();

    let moves: Vec<String> = rig.wire.lines().into_iter().filter(|l| !l.starts_with("MODE:")).collect();
    assert_eq!(moves, vec!["-9,0", "0,9"]);
}

#[test]
fn test_jog_clamps_at_limits() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);
    for _ in 0..20 {
        rig.controller.jog(Direction::Down).unwrap();
    }
    assert_eq!(rig.controller.pose(), Pose::new(90, 45));
    assert_eq!(rig.wire.lines().len(), 20);
}

#[test]
fn test_reset_statuses() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);

    rig.wire.reply_to_reset("INIT:45,100\r\n");
    assert_eq!(rig.controller.reset().unwrap(), Pose::new(45, 100));
    assert_eq!(rig.status.last(), "Motors Reset to Initial Positions");

    rig.wire.reply_to_reset("INIT:abc\r\n");
    assert!(matches!(rig.controller.reset(), Err(RigError::MalformedReset(_))));
    assert_eq!(rig.status.last(), "Error in Reset Response");
    assert_eq!(rig.controller.pose(), Pose::new(45, 100));

    rig.wire.reply_to_reset("INIT45,100\r\n");
    assert!(matches!(rig.controller.reset(), Err(RigError::MalformedReset(_))));
    assert_eq!(rig.status.last(), "Error in Reset Response");

    rig.wire.reply_to_reset("hello\r\n");
    assert!(rig.controller.reset().is_err());
    assert_eq!(rig.status.last(), "Reset Failed");

    assert!(matches!(rig.controller.reset(), Err(RigError::ResetTimeout)));
    assert_eq!(rig.status.last(), "Reset Failed");

    rig.wire.set_fail_writes(true);
    assert!(matches!(rig.controller.reset(), Err(RigError::Transport(_))));
    assert!(rig.status.last().starts_with("Serial Error"));
    assert_eq!(rig.controller.pose(), Pose::new(45, 100));
}

#[test]
fn test_dry_run_link_answers_repeated_resets() {
    let rig = rig_with(Arc::new(NoVision), Duration::ZERO);
    rig.wire.answer_resets_with(Pose::HOME);

    for _ in 0..3 {
        rig.controller.jog(Direction::Right).unwrap();
        assert_eq!(rig.controller.reset().unwrap(), Pose::HOME);
        assert_eq!(rig.status.last(), "Motors Reset to Initial Positions");
    }
}

#[test]
fn test_jog_not_blocked_by_pending_reset() {
    let wire = MemoryLink::new();
    wire.answer_resets_with(Pose::new(45, 100));
    let link = Box::new(SlowReplyLink { wire: wire.clone() });
    let rig = build_rig(link, wire, Arc::new(NoVision), Duration::ZERO, Duration::from_millis(800));

    let ctrl = Arc::clone(&rig.controller);
    let pending = thread::spawn(move || ctrl.reset());
    wait_until("reset request", || rig.wire.lines().contains(&"RESET".to_string()));

    let started = Instant::now();
    assert_eq!(rig.controller.jog(Direction::Left).unwrap(), Pose::new(81, 90));
    assert_eq!(rig.controller.mode(), TrackingMode::Idle);
    assert!(started.elapsed() < Duration::from_millis(300), "jog took {:?}", started.elapsed());

    assert_eq!(pending.join().unwrap().unwrap(), Pose::new(45, 100));
    assert_eq!(rig.wire.lines(), vec!["RESET", "-9,0"]);
}
