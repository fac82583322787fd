use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_FPS_WINDOW: Duration = Duration::from_secs(5);

/// Rolling update-rate counter over a fixed time window.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: VecDeque::new(),
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Record an update at `now` and drop stamps older than the window.
    pub fn tick_at(&mut self, now: Instant) {
        self.stamps.push_back(now);
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Updates per second over the retained window; 0 until two updates.
    pub fn fps(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.stamps.front(), self.stamps.back()) else {
            return 0.0;
        };
        let span = newest.saturating_duration_since(*oldest).as_secs_f64();
        if self.stamps.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (self.stamps.len() - 1) as f64 / span
    }

    pub fn last(&self) -> Option<Instant> {
        self.stamps.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_and_single_tick_report_zero() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.fps(), 0.0);
        fps.tick();
        assert_eq!(fps.fps(), 0.0);
    }

    #[test]
    fn steady_cadence() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::default();
        for i in 0..31 {
            fps.tick_at(t0 + Duration::from_millis(i * 33));
        }
        assert_relative_eq!(fps.fps(), 1000.0 / 33.0, epsilon = 1e-9);
        assert_eq!(fps.last(), Some(t0 + Duration::from_millis(990)));
    }

    #[test]
    fn old_stamps_leave_the_window() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(Duration::from_secs(1));
        fps.tick_at(t0);
        fps.tick_at(t0 + Duration::from_millis(100));
        fps.tick_at(t0 + Duration::from_secs(10));
        assert_eq!(fps.fps(), 0.0);
        fps.tick_at(t0 + Duration::from_millis(10_500));
        assert_relative_eq!(fps.fps(), 2.0, epsilon = 1e-9);
    }
}
