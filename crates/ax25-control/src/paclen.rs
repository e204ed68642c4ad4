/// Minimum consecutive successes before `PaclenAdapter` grows the
/// current paclen back up (spec §4.6).
const GROWTH_STREAK: u32 = 10;
const GROWTH_STEP: u32 = 64;

/// Adapts the outbound information-field size within `[min, max]` (spec
/// §4.6): halves on failure, grows by 64 after ten consecutive successes.
#[derive(Debug, Clone, Copy)]
pub struct PaclenAdapter {
    min: u32,
    max: u32,
    current: u32,
    success_streak: u32,
}

impl PaclenAdapter {
    pub fn new(min: u32, max: u32, default: u32) -> Self {
        Self { min, max, current: default.clamp(min, max), success_streak: 0 }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn on_failure(&mut self) {
        self.success_streak = 0;
        self.current = self.min.max(self.current / 2);
    }

    pub fn on_success(&mut self) {
        self.success_streak += 1;
        if self.success_streak >= GROWTH_STREAK {
            self.current = self.max.min(self.current + GROWTH_STEP);
            self.success_streak = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_halves_down_to_floor() {
        let mut adapter = PaclenAdapter::new(32, 256, 128);
        adapter.on_failure();
        assert_eq!(adapter.current(), 64);
        adapter.on_failure();
        assert_eq!(adapter.current(), 32);
        adapter.on_failure();
        assert_eq!(adapter.current(), 32, "floor is min, not zero");
    }

    #[test]
    fn ten_successes_grow_by_sixty_four() {
        let mut adapter = PaclenAdapter::new(32, 256, 128);
        for _ in 0..9 {
            adapter.on_success();
            assert_eq!(adapter.current(), 128, "growth waits for the full streak");
        }
        adapter.on_success();
        assert_eq!(adapter.current(), 192);
    }

    #[test]
    fn growth_clamps_to_max() {
        let mut adapter = PaclenAdapter::new(32, 256, 250);
        for _ in 0..10 {
            adapter.on_success();
        }
        assert_eq!(adapter.current(), 256);
    }

    #[test]
    fn a_failure_resets_the_success_streak() {
        let mut adapter = PaclenAdapter::new(32, 256, 128);
        for _ in 0..5 {
            adapter.on_success();
        }
        adapter.on_failure();
        for _ in 0..9 {
            adapter.on_success();
        }
        assert_eq!(adapter.current(), 64, "streak restarted, tenth success not reached yet");
    }
}
