//! Steps-per-second pacing

use crate::config::SpeedControl;
use std::time::Duration;

/// Turns frame durations into tick budgets
///
/// Fractional ticks carry over to the next frame, so 90 steps/s at 60 frames/s
/// alternates between one and two ticks.
#[derive(Debug, Default)]
pub struct FramePacer {
    carry: f64,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks to run for a frame lasting `frame`, never more than `max`
    pub fn budget(&mut self, frame: Duration, speed: &SpeedControl, max: usize) -> usize {
        if speed.is_unbounded() {
            self.carry = 0.0;
            return max;
        }
        let exact = speed.get() * frame.as_secs_f64() + self.carry;
        let whole = exact.floor();
        self.carry = exact - whole;
        let ticks = whole as usize;
        if ticks > max {
            self.carry = 0.0;
            return max;
        }
        ticks
    }

    pub fn reset(&mut self) {
        self.carry = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_uses_max() {
        let mut pacer = FramePacer::new();
        let speed = SpeedControl::new(0.0);
        assert_eq!(pacer.budget(Duration::from_millis(16), &speed, 500), 500);
    }

    #[test]
    fn test_fractional_carry() {
        let mut pacer = FramePacer::new();
        let speed = SpeedControl::new(90.0);
        let frame = Duration::from_secs_f64(1.0 / 60.0);
        let total: usize = (0..60).map(|_| pacer.budget(frame, &speed, 1000)).sum();
        assert!((89..=90).contains(&total));
    }

    #[test]
    fn test_capped_by_max() {
        let mut pacer = FramePacer::new();
        let speed = SpeedControl::new(1_000_000.0);
        assert_eq!(pacer.budget(Duration::from_secs(1), &speed, 10), 10);
    }
}
