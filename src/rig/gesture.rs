/**
 * Gesture Debouncer
 *
 * Turns the per-frame finger classification stream into discrete jog
 * commands. A gesture must be seen on `threshold` consecutive frames
 * before it fires, and the run restarts after every firing so a held
 * gesture repeats at most once per `threshold` frames.
 */

use log::debug;

use super::command::{Direction, MotorCommand};

pub const DEFAULT_THRESHOLD: u32 = 8;
pub const DEFAULT_STEP: i32 = 9;

/// Extended-finger flags, ordered [thumb, index, middle, ring, pinky]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GestureSample(pub [bool; 5]);

impl GestureSample {
    /// Build from 0/1 flags as produced by most hand classifiers.
    pub fn from_flags(flags: [u8; 5]) -> Self {
        GestureSample(flags.map(|f| f != 0))
    }

    pub fn flags(&self) -> [u8; 5] {
        self.0.map(u8::from)
    }

    /// Jog direction bound to this finger pattern, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self.flags() {
            [0, 1, 0, 0, 0] => Some(Direction::Left),
            [0, 1, 1, 0, 0] => Some(Direction::Right),
            [0, 1, 1, 1, 0] => Some(Direction::Down),
            [0, 1, 1, 1, 1] => Some(Direction::Up),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    threshold: u32,
    step: i32,
    last: Option<GestureSample>,
    run: u32,
}

impl GestureDebouncer {
    pub fn new(threshold: u32, step: i32) -> Self {
        Self {
            threshold: threshold.max(1),
            step,
            last: None,
            run: 0,
        }
    }

    /// Feed one frame's classification. Returns a command when a mapped
    /// gesture completes a full run.
    pub fn observe(&mut self, sample: GestureSample) -> Option<MotorCommand> {
        if self.last == Some(sample) {
            self.run += 1;
        } else {
            self.last = Some(sample);
            self.run = 1;
        }

        if self.run < self.threshold {
            return None;
        }

        //unmapped patterns still consume the run
        self.run = 0;
        let cmd = sample.direction().map(|d| d.delta(self.step));
        debug!("gesture {:?} held for {} frames -> {:?}", sample.flags(), self.threshold, cmd);
        cmd
    }

    pub fn run_count(&self) -> u32 {
        self.run
    }

    pub fn last_sample(&self) -> Option<GestureSample> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.run = 0;
    }
}

impl Default for GestureDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: GestureSample = GestureSample([false, true, false, false, false]);
    const TWO: GestureSample = GestureSample([false, true, true, false, false]);
    const FIST: GestureSample = GestureSample([false; 5]);

    #[test]
    fn test_mapping_table() {
        let cases = [
            ([0, 1, 0, 0, 0], Some(MotorCommand::new(-9, 0))),
            ([0, 1, 1, 0, 0], Some(MotorCommand::new(9, 0))),
            ([0, 1, 1, 1, 0], Some(MotorCommand::new(0, -9))),
            ([0, 1, 1, 1, 1], Some(MotorCommand::new(0, 9))),
            ([1, 1, 1, 1, 1], None),
            ([0, 0, 0, 0, 0], None),
        ];
        for (flags, expected) in cases {
            let sample = GestureSample::from_flags(flags);
            assert_eq!(sample.direction().map(|d| d.delta(9)), expected, "{flags:?}");
        }
    }

    #[test]
    fn test_fires_every_threshold_frames() {
        let mut debouncer = GestureDebouncer::default();
        let mut fired = Vec::new();
        for frame in 1..=16 {
            if debouncer.observe(INDEX).is_some() {
                fired.push(frame);
            }
        }
        assert_eq!(fired, vec![8, 16]);
    }

    #[test]
    fn test_mismatch_restarts_run() {
        let mut debouncer = GestureDebouncer::default();
        for _ in 0..7 {
            assert!(debouncer.observe(INDEX).is_none());
        }
        assert!(debouncer.observe(TWO).is_none());
        assert_eq!(debouncer.run_count(), 1);
        for _ in 0..6 {
            assert!(debouncer.observe(TWO).is_none());
        }
        assert_eq!(debouncer.observe(TWO), Some(MotorCommand::new(9, 0)));
        assert_eq!(debouncer.run_count(), 0);
    }

    #[test]
    fn test_unmapped_pattern_consumes_run() {
        let mut debouncer = GestureDebouncer::default();
        for _ in 0..8 {
            assert!(debouncer.observe(FIST).is_none());
        }
        assert_eq!(debouncer.run_count(), 0);
        assert_eq!(debouncer.last_sample(), Some(FIST));
    }

    #[test]
    fn test_custom_threshold() {
        let mut debouncer = GestureDebouncer::new(2, 5);
        assert!(debouncer.observe(INDEX).is_none());
        assert_eq!(debouncer.observe(INDEX), Some(MotorCommand::new(-5, 0)));
    }
}
