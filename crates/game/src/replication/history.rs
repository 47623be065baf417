use crate::arena::Rect;

/// A position observed at one instant of game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimedState {
    pub time: i64,
    pub rect: Rect,
}

impl TimedState {
    pub fn new(time: i64, rect: Rect) -> Self {
        Self { time, rect }
    }
}

/// Fixed-size ring of time-stamped positions for one entity.
///
/// Slots are overwritten oldest-first. `head` always points at the entry with
/// the greatest time, so lookups scan every slot instead of relying on the
/// physical order.
#[derive(Debug, Clone)]
pub struct StateHistory {
    states: Vec<Option<TimedState>>,
    head: usize,
}

impl StateHistory {
    pub fn new(capacity: usize, time: i64, rect: Rect) -> Self {
        let mut states: Vec<Option<TimedState>> = (0..capacity.max(1)).map(|_| None).collect();
        states[0] = Some(TimedState::new(time, rect));
        Self { states, head: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn latest(&self) -> TimedState {
        self.states[self.head].unwrap_or_default()
    }

    /// Appends a state in the next slot. States older than the newest entry
    /// are refused so the ring never rewinds.
    pub fn record(&mut self, time: i64, rect: Rect) -> bool {
        if time < self.latest().time {
            return false;
        }
        self.head = (self.head + 1) % self.states.len();
        self.states[self.head] = Some(TimedState::new(time, rect));
        true
    }

    /// Rewrites every entry at or after `time` to `(time, rect)`.
    pub fn clear_from(&mut self, time: i64, rect: Rect) {
        for state in self.states.iter_mut().flatten() {
            if state.time >= time {
                *state = TimedState::new(time, rect);
            }
        }
    }

    /// Moves every entry stamped after `time` back onto `time`, holding the
    /// newest position. Used when game time itself steps backwards.
    pub fn rewind_to(&mut self, time: i64) {
        let latest = self.latest();
        if latest.time > time {
            self.clear_from(time, latest.rect);
        }
    }

    /// Entries from the oldest written slot to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &TimedState> {
        let start = self.head + 1;
        let len = self.states.len();
        (0..len).filter_map(move |i| self.states[(start + i) % len].as_ref())
    }

    /// Position at `time`, linearly interpolated between the two bracketing
    /// entries and held at the ends of the recorded range.
    pub fn sample_at(&self, time: i64) -> Rect {
        let mut before: Option<&TimedState> = None;
        let mut after: Option<&TimedState> = None;
        let mut exact: Option<&TimedState> = None;

        for state in self.iter() {
            if state.time == time {
                exact = Some(state);
            } else if state.time < time {
                if before.is_none_or(|b| state.time >= b.time) {
                    before = Some(state);
                }
            } else if after.is_none_or(|a| state.time <= a.time) {
                after = Some(state);
            }
        }

        if let Some(state) = exact {
            return state.rect;
        }

        match (before, after) {
            (Some(from), Some(to)) => interpolate(from, to, time),
            (Some(newest), None) => newest.rect,
            (None, Some(oldest)) => oldest.rect,
            (None, None) => self.latest().rect,
        }
    }
}

fn interpolate(from: &TimedState, to: &TimedState, time: i64) -> Rect {
    // widened: remote stamps may sit anywhere in the i64 range
    let elapsed = i128::from(time) - i128::from(from.time);
    let span = i128::from(to.time) - i128::from(from.time);
    let fraction = elapsed as f64 / span as f64;
    let position = from
        .rect
        .position()
        .as_dvec2()
        .lerp(to.rect.position().as_dvec2(), fraction)
        .round()
        .as_ivec2();
    to.rect.with_position(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32) -> Rect {
        Rect::new(x, y, 20, 20)
    }

    #[test]
    fn single_state_is_returned_for_any_query() {
        let history = StateHistory::new(10, 100, rect(5, 5));

        assert_eq!(history.sample_at(0), rect(5, 5));
        assert_eq!(history.sample_at(100), rect(5, 5));
        assert_eq!(history.sample_at(10_000), rect(5, 5));
    }

    #[test]
    fn interpolates_between_bracketing_entries() {
        let mut history = StateHistory::new(10, 0, rect(0, 0));
        history.record(100, rect(100, -50));

        assert_eq!(history.sample_at(25), rect(25, -13));
        assert_eq!(history.sample_at(50), rect(50, -25));
        assert_eq!(history.sample_at(80), rect(80, -40));
    }

    #[test]
    fn holds_newest_beyond_range_and_oldest_before_it() {
        let mut history = StateHistory::new(10, 100, rect(0, 0));
        history.record(200, rect(10, 10));
        history.record(300, rect(30, 30));

        assert_eq!(history.sample_at(1000), rect(30, 30));
        assert_eq!(history.sample_at(50), rect(0, 0));
    }

    #[test]
    fn exact_match_is_returned_verbatim() {
        let mut history = StateHistory::new(10, 0, rect(0, 0));
        history.record(10, rect(7, 3));
        history.record(20, rect(100, 100));

        assert_eq!(history.sample_at(10), rect(7, 3));
    }

    #[test]
    fn wraps_around_overwriting_oldest() {
        let mut history = StateHistory::new(4, 0, rect(0, 0));
        for i in 1..=6 {
            history.record(i * 10, rect(i as i32 * 10, 0));
        }

        let times: Vec<i64> = history.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![30, 40, 50, 60]);
        assert_eq!(history.latest().time, 60);
        assert_eq!(history.sample_at(45), rect(45, 0));
        // oldest surviving entry is held for earlier queries
        assert_eq!(history.sample_at(0), rect(30, 0));
    }

    #[test]
    fn refuses_states_older_than_newest() {
        let mut history = StateHistory::new(10, 100, rect(0, 0));

        assert!(!history.record(50, rect(9, 9)));
        assert!(history.record(100, rect(1, 1)));
        assert_eq!(history.latest().rect, rect(1, 1));
    }

    #[test]
    fn clear_from_then_record_leaves_nothing_in_the_future() {
        let mut history = StateHistory::new(10, 0, rect(0, 0));
        for i in 1..=8 {
            history.record(i * 100, rect(i as i32, 0));
        }

        history.clear_from(350, rect(-5, -5));
        assert!(history.record(350, rect(-5, -5)));

        assert!(history.iter().all(|s| s.time <= 350));
        assert_eq!(history.latest(), TimedState::new(350, rect(-5, -5)));
        assert_eq!(history.sample_at(300), rect(3, 0));
        assert_eq!(history.sample_at(900), rect(-5, -5));
    }

    #[test]
    fn extreme_stamps_interpolate_without_overflow() {
        let mut history = StateHistory::new(10, i64::MIN, rect(0, 0));
        history.record(i64::MAX, rect(100, 0));

        assert_eq!(history.sample_at(0), rect(50, 0));
        assert_eq!(history.sample_at(i64::MIN + 1), rect(0, 0));
    }

    #[test]
    fn rewind_pulls_future_entries_back_and_accepts_new_ones() {
        let mut history = StateHistory::new(10, 0, rect(0, 0));
        history.record(100, rect(8, 0));
        history.record(110, rect(16, 0));

        history.rewind_to(60);
        assert!(history.iter().all(|s| s.time <= 60));
        assert_eq!(history.latest(), TimedState::new(60, rect(16, 0)));
        assert!(history.record(70, rect(24, 0)));

        // nothing to do when the newest entry is already in the past
        history.rewind_to(500);
        assert_eq!(history.latest(), TimedState::new(70, rect(24, 0)));
    }
}
