//! Retest tracking — the per-breakout state machine that trades signal
//! frequency for quality.
//!
//! A breakout alone is noise-prone. The tracker waits for price to return to
//! the broken level (within a tolerance band) and close back in the breakout
//! direction before declaring the break confirmed. Breakouts that reverse
//! through the range fail; breakouts that drift sideways too long expire.
//! Terminal states are absorbing.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::domain::{Bar, Breakout, Direction, RetestState, RetestStatus};

#[derive(Debug, Clone)]
pub struct RetestTracker {
    state: RetestState,
    retest_tolerance: f64,
    max_wait_bars: usize,
    /// Timestamp of the latest bar already processed. Repeated ticks over
    /// unchanged data re-present the same bar; advancing twice would
    /// double-count the wait, so already-seen bars are no-ops.
    last_seen: DateTime<Utc>,
}

impl RetestTracker {
    pub fn new(breakout: Breakout, config: &EngineConfig) -> Self {
        let last_seen = breakout.occurred_at;
        Self {
            state: RetestState::new(breakout),
            retest_tolerance: config.retest_tolerance,
            max_wait_bars: config.max_wait_bars,
            last_seen,
        }
    }

    pub fn state(&self) -> &RetestState {
        &self.state
    }

    pub fn status(&self) -> RetestStatus {
        self.state.status
    }

    pub fn breakout(&self) -> &Breakout {
        &self.state.breakout
    }

    pub fn into_state(self) -> RetestState {
        self.state
    }

    /// Advance the state machine by one bar.
    ///
    /// Transition order within a bar:
    /// 1. failed breakout — close back inside the range beyond the noise margin
    /// 2. touch — price enters the tolerance band around the broken level
    /// 3. confirmation — touched and the bar closes back in the breakout direction
    /// 4. expiry — waited longer than `max_wait_bars` without resolution
    ///
    /// A single bar may both touch the band and confirm (dip to the level,
    /// close beyond it).
    pub fn advance(&mut self, bar: &Bar, noise_margin: f64) -> RetestStatus {
        if self.state.status.is_terminal() || bar.timestamp <= self.last_seen {
            return self.state.status;
        }
        self.last_seen = bar.timestamp;
        self.state.bars_since_breakout += 1;

        let breakout = &self.state.breakout;
        let level = breakout.broken_level();
        let band = self.retest_tolerance * breakout.range.width();

        match breakout.direction {
            Direction::Up => {
                if bar.close < breakout.range.resistance - noise_margin {
                    self.state.status = RetestStatus::RetestFailed;
                    return self.state.status;
                }
                if bar.low <= level + band {
                    self.state.touched = true;
                    let approach = (bar.low - level).abs();
                    self.state.closest_approach = Some(
                        self.state
                            .closest_approach
                            .map_or(approach, |d| d.min(approach)),
                    );
                }
                if self.state.touched && bar.close > level {
                    self.state.status = RetestStatus::RetestConfirmed;
                    self.state.retest_at = Some(bar.timestamp);
                    return self.state.status;
                }
            }
            Direction::Down => {
                if bar.close > breakout.range.support + noise_margin {
                    self.state.status = RetestStatus::RetestFailed;
                    return self.state.status;
                }
                if bar.high >= level - band {
                    self.state.touched = true;
                    let approach = (bar.high - level).abs();
                    self.state.closest_approach = Some(
                        self.state
                            .closest_approach
                            .map_or(approach, |d| d.min(approach)),
                    );
                }
                if self.state.touched && bar.close < level {
                    self.state.status = RetestStatus::RetestConfirmed;
                    self.state.retest_at = Some(bar.timestamp);
                    return self.state.status;
                }
            }
        }

        if self.state.bars_since_breakout > self.max_wait_bars {
            self.state.status = RetestStatus::Expired;
        }
        self.state.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Range, Timeframe};
    use crate::test_utils::{make_bar, ts};

    fn up_breakout() -> Breakout {
        Breakout {
            range: Range {
                symbol: "R_50".into(),
                timeframe: Timeframe::M15,
                support: 100.0,
                resistance: 110.0,
                formed_at: ts(29),
                window_len: 30,
                support_touches: 2,
                resistance_touches: 2,
            },
            direction: Direction::Up,
            occurred_at: ts(30),
            strength: 0.2,
        }
    }

    fn down_breakout() -> Breakout {
        Breakout {
            direction: Direction::Down,
            strength: 0.2,
            ..up_breakout()
        }
    }

    fn tracker(breakout: Breakout) -> RetestTracker {
        RetestTracker::new(breakout, &EngineConfig::default())
    }

    const MARGIN: f64 = 1.0;

    #[test]
    fn touch_then_confirm_same_bar() {
        let mut t = tracker(up_breakout());
        // Dips to 109.5 (inside the band around 110), closes at 111.
        let bar = make_bar(31, 111.5, 111.8, 109.5, 111.0);
        assert_eq!(t.advance(&bar, MARGIN), RetestStatus::RetestConfirmed);
        assert_eq!(t.state().retest_at, Some(ts(31)));
        assert_eq!(t.state().bars_to_confirm(), Some(1));
        assert_eq!(t.state().closest_approach, Some(0.5));
    }

    #[test]
    fn touch_then_confirm_later_bar() {
        let mut t = tracker(up_breakout());
        // Touches the band but closes right at the level: not yet confirmed.
        let touch = make_bar(31, 111.0, 111.2, 109.8, 110.0);
        assert_eq!(t.advance(&touch, MARGIN), RetestStatus::AwaitingRetest);
        assert!(t.state().touched);
        // Continuation close confirms.
        let go = make_bar(32, 110.0, 111.6, 109.9, 111.5);
        assert_eq!(t.advance(&go, MARGIN), RetestStatus::RetestConfirmed);
        assert_eq!(t.state().retest_at, Some(ts(32)));
        assert_eq!(t.state().bars_to_confirm(), Some(2));
    }

    #[test]
    fn reversal_through_range_fails() {
        let mut t = tracker(up_breakout());
        // Close back inside the range beyond the margin (110 - 1 = 109).
        let bar = make_bar(31, 110.0, 110.5, 98.5, 99.0);
        assert_eq!(t.advance(&bar, MARGIN), RetestStatus::RetestFailed);
    }

    #[test]
    fn shallow_pullback_inside_margin_does_not_fail() {
        let mut t = tracker(up_breakout());
        // Close at 109.5: below the level but within the noise margin.
        let bar = make_bar(31, 111.0, 111.0, 109.3, 109.5);
        assert_eq!(t.advance(&bar, MARGIN), RetestStatus::AwaitingRetest);
    }

    #[test]
    fn expires_after_max_wait() {
        let mut t = tracker(up_breakout());
        // Sideways above the band: never touches, never fails.
        for i in 0..20 {
            let bar = make_bar(31 + i, 115.0, 115.5, 114.5, 115.0);
            let status = t.advance(&bar, MARGIN);
            if i < 15 {
                assert_eq!(status, RetestStatus::AwaitingRetest, "bar {i}");
            } else {
                assert_eq!(status, RetestStatus::Expired);
            }
        }
        assert_eq!(t.status(), RetestStatus::Expired);
    }

    #[test]
    fn terminal_state_is_absorbing() {
        let mut t = tracker(up_breakout());
        let fail = make_bar(31, 110.0, 110.5, 98.5, 99.0);
        assert_eq!(t.advance(&fail, MARGIN), RetestStatus::RetestFailed);
        // A perfect retest bar afterwards changes nothing.
        let retest = make_bar(32, 111.5, 111.8, 109.5, 111.0);
        assert_eq!(t.advance(&retest, MARGIN), RetestStatus::RetestFailed);
    }

    #[test]
    fn repeated_tick_same_bar_is_noop() {
        let mut t = tracker(up_breakout());
        let bar = make_bar(31, 115.0, 115.5, 114.5, 115.0);
        t.advance(&bar, MARGIN);
        t.advance(&bar, MARGIN);
        t.advance(&bar, MARGIN);
        assert_eq!(t.state().bars_since_breakout, 1);
    }

    #[test]
    fn down_breakout_confirms_symmetrically() {
        let mut t = tracker(down_breakout());
        // Rallies to 100.4 (band around 100), closes at 98.9.
        let bar = make_bar(31, 98.5, 100.4, 98.2, 98.9);
        assert_eq!(t.advance(&bar, MARGIN), RetestStatus::RetestConfirmed);
        assert_eq!(t.state().closest_approach, Some(0.4));
    }

    #[test]
    fn down_breakout_fails_on_reclaim() {
        let mut t = tracker(down_breakout());
        // Close back above support + margin (101).
        let bar = make_bar(31, 99.0, 102.5, 98.8, 102.0);
        assert_eq!(t.advance(&bar, MARGIN), RetestStatus::RetestFailed);
    }
}
