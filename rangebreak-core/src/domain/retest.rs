//! Retest lifecycle state for an active breakout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Breakout;

/// Lifecycle status of a retest.
///
/// `AwaitingRetest` is the only non-terminal state. Terminal states are
/// absorbing: once reached, the state never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetestStatus {
    AwaitingRetest,
    RetestConfirmed,
    RetestFailed,
    Expired,
}

impl RetestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetestStatus::AwaitingRetest)
    }
}

/// Per-breakout retest bookkeeping.
///
/// One `RetestState` exists per active breakout; the engine discards it once
/// terminal. Only `RetestConfirmed` makes the breakout signal-eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetestState {
    pub breakout: Breakout,
    pub status: RetestStatus,
    /// Timestamp of the bar that confirmed the retest, if any.
    pub retest_at: Option<DateTime<Utc>>,
    pub bars_since_breakout: usize,
    /// Whether price has entered the tolerance band around the broken level.
    pub touched: bool,
    /// Closest approach of price to the broken level while awaiting,
    /// as an absolute distance. Feeds retest-precision scoring.
    pub closest_approach: Option<f64>,
}

impl RetestState {
    pub fn new(breakout: Breakout) -> Self {
        Self {
            breakout,
            status: RetestStatus::AwaitingRetest,
            retest_at: None,
            bars_since_breakout: 0,
            touched: false,
            closest_approach: None,
        }
    }

    /// Bars from breakout to confirmation. `None` unless confirmed.
    pub fn bars_to_confirm(&self) -> Option<usize> {
        (self.status == RetestStatus::RetestConfirmed).then_some(self.bars_since_breakout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Range, Timeframe};
    use crate::test_utils::ts;

    fn sample_state() -> RetestState {
        RetestState::new(Breakout {
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
        })
    }

    #[test]
    fn new_state_awaits() {
        let state = sample_state();
        assert_eq!(state.status, RetestStatus::AwaitingRetest);
        assert!(!state.status.is_terminal());
        assert!(!state.touched);
        assert_eq!(state.bars_since_breakout, 0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RetestStatus::RetestConfirmed.is_terminal());
        assert!(RetestStatus::RetestFailed.is_terminal());
        assert!(RetestStatus::Expired.is_terminal());
    }

    #[test]
    fn bars_to_confirm_only_when_confirmed() {
        let mut state = sample_state();
        state.bars_since_breakout = 3;
        assert_eq!(state.bars_to_confirm(), None);
        state.status = RetestStatus::RetestConfirmed;
        state.retest_at = Some(ts(33));
        assert_eq!(state.bars_to_confirm(), Some(3));
    }
}
