/// Longest wall-clock gap credited to the accumulator in one frame.
const MAX_FRAME_MS: i64 = 250;

/// Fixed-rate simulation clock driven by a variable-rate frame loop.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step_ms: i64,
    accumulator_ms: i64,
    last_frame: Option<i64>,
}

impl FixedTimestep {
    pub fn new(step_ms: i64) -> Self {
        Self {
            step_ms: step_ms.max(1),
            accumulator_ms: 0,
            last_frame: None,
        }
    }

    pub fn step_ms(&self) -> i64 {
        self.step_ms
    }

    /// Credits the time elapsed since the previous frame. The first call only
    /// records the frame time.
    pub fn advance(&mut self, now: i64) {
        if let Some(last) = self.last_frame {
            self.accumulate(now - last);
        }
        self.last_frame = Some(now);
    }

    pub fn accumulate(&mut self, delta_ms: i64) {
        self.accumulator_ms += delta_ms.clamp(0, MAX_FRAME_MS);
        self.accumulator_ms = self.accumulator_ms.min(MAX_FRAME_MS);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator_ms >= self.step_ms
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator_ms >= self.step_ms {
            self.accumulator_ms -= self.step_ms;
            true
        } else {
            false
        }
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator_ms as f32 / self.step_ms as f32
    }

    pub fn reset(&mut self) {
        self.accumulator_ms = 0;
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(10);

        ts.accumulate(20);
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn first_frame_only_starts_the_clock() {
        let mut ts = FixedTimestep::new(10);

        ts.advance(1_000);
        assert!(!ts.should_tick());

        ts.advance(1_015);
        assert!(ts.consume_tick());
        assert!((ts.alpha() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut ts = FixedTimestep::new(10);
        ts.advance(0);
        ts.advance(10_000);

        let mut ticks = 0;
        while ts.consume_tick() {
            ticks += 1;
        }
        assert_eq!(ticks, MAX_FRAME_MS / 10);
    }

    #[test]
    fn clock_going_backwards_adds_nothing() {
        let mut ts = FixedTimestep::new(10);
        ts.advance(500);
        ts.advance(400);
        assert!(!ts.should_tick());
    }
}
