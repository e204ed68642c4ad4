const LOSS_EWMA_SMOOTHING: f64 = 0.2;
const STABLE_SUCCESS_STREAK: u32 = 10;
const STABLE_MAX_LOSS_RATE: f64 = 0.05;
const DEGRADED_PACLEN: u32 = 64;
const DEGRADED_WINDOW: u32 = 1;

/// Coarse link classification derived from recent success/fail history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Stable,
    Degraded,
    Nominal,
}

/// Per-peer success/fail streak tracker with an EWMA loss rate (spec
/// §4.6). Distinct from [`crate::RttEstimator`]: this classifies the
/// link coarsely (stable/degraded) and feeds `adaptiveParameters`, which
/// `ax25-session`/`ax25-transfer` consult for paclen/window hints
/// alongside (not instead of) the AIMD window and paclen adapter.
#[derive(Debug, Clone, Copy)]
pub struct LinkRttTracker {
    success_streak: u32,
    fail_streak: u32,
    loss_rate: f64,
}

impl LinkRttTracker {
    pub fn new() -> Self {
        Self { success_streak: 0, fail_streak: 0, loss_rate: 0.0 }
    }

    pub fn on_success(&mut self) {
        self.success_streak += 1;
        self.fail_streak = 0;
        self.loss_rate = (1.0 - LOSS_EWMA_SMOOTHING) * self.loss_rate;
    }

    pub fn on_failure(&mut self) {
        self.fail_streak += 1;
        self.success_streak = 0;
        self.loss_rate = (1.0 - LOSS_EWMA_SMOOTHING) * self.loss_rate + LOSS_EWMA_SMOOTHING;
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    pub fn success_streak(&self) -> u32 {
        self.success_streak
    }

    pub fn fail_streak(&self) -> u32 {
        self.fail_streak
    }

    pub fn is_stable(&self) -> bool {
        self.success_streak >= STABLE_SUCCESS_STREAK && self.loss_rate < STABLE_MAX_LOSS_RATE
    }

    pub fn is_degraded(&self) -> bool {
        self.fail_streak >= 1
    }

    pub fn health(&self) -> LinkHealth {
        if self.is_stable() {
            LinkHealth::Stable
        } else if self.is_degraded() {
            LinkHealth::Degraded
        } else {
            LinkHealth::Nominal
        }
    }

    /// `(paclen, window, reason)` given the session's currently
    /// configured base values.
    pub fn adaptive_parameters(&self, base_paclen: u32, base_window: u32) -> (u32, u32, String) {
        match self.health() {
            LinkHealth::Stable => (base_paclen * 2, base_window + 1, "Stable link".to_string()),
            LinkHealth::Degraded => (
                DEGRADED_PACLEN,
                DEGRADED_WINDOW,
                format!("Loss rate {:.0}%", self.loss_rate * 100.0),
            ),
            LinkHealth::Nominal => (base_paclen, base_window, "Nominal".to_string()),
        }
    }
}

impl Default for LinkRttTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_after_ten_clean_successes() {
        let mut tracker = LinkRttTracker::new();
        for _ in 0..10 {
            tracker.on_success();
        }
        assert!(tracker.is_stable());
        let (paclen, window, reason) = tracker.adaptive_parameters(128, 4);
        assert_eq!((paclen, window), (256, 5));
        assert_eq!(reason, "Stable link");
    }

    #[test]
    fn a_single_failure_marks_degraded_and_resets_success_streak() {
        let mut tracker = LinkRttTracker::new();
        for _ in 0..10 {
            tracker.on_success();
        }
        tracker.on_failure();
        assert!(!tracker.is_stable());
        assert!(tracker.is_degraded());
        let (paclen, window, _) = tracker.adaptive_parameters(128, 4);
        assert_eq!((paclen, window), (64, 1));
    }
}
