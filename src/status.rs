//! Status reporting towards the presentation surface.

use std::sync::Mutex;

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information (idle, reset done)
    Info,
    /// Something is running
    Active,
    /// Something stopped or failed
    Error,
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Info => "blue",
            Severity::Active => "green",
            Severity::Error => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub severity: Severity,
}

impl Status {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self { text: text.into(), severity }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info)
    }

    pub fn active(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Active)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }
}

/// Receives every status change the rig reports.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: Status);
}

/// Latest status plus an epoch that bumps on every update, so a UI loop
/// can poll for changes.
pub struct StatusBoard {
    latest: Mutex<(Status, u64)>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new((Status::info("Idle"), 0)),
        }
    }

    pub fn latest(&self) -> (Status, u64) {
        lock(&self.latest).clone()
    }

    pub fn epoch(&self) -> u64 {
        lock(&self.latest).1
    }

    pub fn has_new(&self, last_seen: u64) -> bool {
        self.epoch() > last_seen
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusBoard {
    fn set_status(&self, status: Status) {
        let mut latest = lock(&self.latest);
        latest.1 += 1;
        latest.0 = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_starts_idle() {
        let board = StatusBoard::new();
        let (status, epoch) = board.latest();
        assert_eq!(status.text, "Idle");
        assert_eq!(status.severity, Severity::Info);
        assert_eq!(epoch, 0);
    }

    #[test]
    fn test_board_epoch_tracks_updates() {
        let board = StatusBoard::new();
        assert!(!board.has_new(0));

        board.set_status(Status::active("Face Tracking: Active"));
        assert!(board.has_new(0));
        let seen = board.epoch();

        board.set_status(Status::error("Tracking Stopped"));
        assert!(board.has_new(seen));
        let (status, epoch) = board.latest();
        assert_eq!(status.text, "Tracking Stopped");
        assert_eq!(status.severity.color(), "red");
        assert_eq!(epoch, 2);
    }
}
