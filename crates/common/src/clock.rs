//! Timing utilities for frame pacing and timestamp conversion.

/// Frame pacing controller for the live render loop.
///
/// Keeps the loop from drawing more often than the target refresh rate
/// while letting it catch up immediately after a late tick.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

/// Presentation timestamp of a frame index in microseconds.
pub fn frame_pts_us(frame_index: u64, fps: u32) -> u64 {
    frame_index * 1_000_000 / fps.max(1) as u64
}

/// Duration of one frame in microseconds.
pub fn frame_duration_us(fps: u32) -> u64 {
    1_000_000 / fps.max(1) as u64
}

/// Media time of a frame index in seconds.
pub fn frame_time_secs(frame_index: u64, fps: u32) -> f64 {
    frame_index as f64 / fps.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(17_000_000)); // ~17ms later, should fire (60Hz ~ 16.67ms)
    }

    #[test]
    fn test_frame_timestamps_at_40fps() {
        assert_eq!(frame_pts_us(0, 40), 0);
        assert_eq!(frame_pts_us(1, 40), 25_000);
        assert_eq!(frame_pts_us(40, 40), 1_000_000);
        assert_eq!(frame_duration_us(40), 25_000);
    }

    #[test]
    fn test_frame_time_secs() {
        assert!((frame_time_secs(20, 40) - 0.5).abs() < 1e-12);
    }
}
