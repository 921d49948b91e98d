//! Level calculation — entry, stop and target from range geometry and
//! volatility, with the ordering invariant validated before emission.

use thiserror::Error;

use crate::config::EngineConfig;
use crate::domain::{Bar, Direction, RetestState, RetestStatus};

/// Computed trade levels for a confirmed retest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Level computation failures. A violated ordering suppresses the signal —
/// it is never silently corrected.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("retest not confirmed (status {status:?}); levels undefined")]
    NotConfirmed { status: RetestStatus },

    #[error(
        "level ordering violated for {direction:?}: entry={entry}, stop={stop_loss}, target={take_profit}"
    )]
    InvalidOrdering {
        direction: Direction,
        entry: f64,
        stop_loss: f64,
        take_profit: f64,
    },
}

#[derive(Debug, Clone)]
pub struct LevelCalculator {
    stop_buffer_atr_mult: f64,
    risk_reward_ratio: f64,
}

impl LevelCalculator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            stop_buffer_atr_mult: config.stop_buffer_atr_mult,
            risk_reward_ratio: config.risk_reward_ratio,
        }
    }

    /// Compute levels for a confirmed retest.
    ///
    /// - entry: the confirming bar's close
    /// - stop: the far side of the broken level, buffered by ATR so a normal
    ///   retracement does not tag it
    /// - target: entry plus the direction-signed risk:reward multiple of the
    ///   range width
    ///
    /// Guarantees Up: stop < entry < target and Down: target < entry < stop,
    /// or fails with [`LevelError::InvalidOrdering`].
    pub fn compute(
        &self,
        state: &RetestState,
        entry_bar: &Bar,
        atr: f64,
    ) -> Result<Levels, LevelError> {
        if state.status != RetestStatus::RetestConfirmed {
            return Err(LevelError::NotConfirmed {
                status: state.status,
            });
        }

        let breakout = &state.breakout;
        let sign = breakout.direction.sign();
        let level = breakout.broken_level();
        let buffer = self.stop_buffer_atr_mult * atr;

        let entry = entry_bar.close;
        let stop_loss = level - sign * buffer;
        let take_profit = entry + sign * self.risk_reward_ratio * breakout.range.width();

        let ordered = match breakout.direction {
            Direction::Up => stop_loss < entry && entry < take_profit,
            Direction::Down => take_profit < entry && entry < stop_loss,
        };
        if !ordered {
            return Err(LevelError::InvalidOrdering {
                direction: breakout.direction,
                entry,
                stop_loss,
                take_profit,
            });
        }

        Ok(Levels {
            entry,
            stop_loss,
            take_profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Breakout, Range, Timeframe};
    use crate::test_utils::{assert_approx, make_bar, ts, DEFAULT_EPSILON};

    fn confirmed_state(direction: Direction) -> RetestState {
        let mut state = RetestState::new(Breakout {
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
            direction,
            occurred_at: ts(30),
            strength: 0.2,
        });
        state.status = RetestStatus::RetestConfirmed;
        state.retest_at = Some(ts(32));
        state.bars_since_breakout = 2;
        state.touched = true;
        state
    }

    fn calculator() -> LevelCalculator {
        LevelCalculator::from_config(&EngineConfig::default())
    }

    #[test]
    fn up_levels_ordered() {
        let state = confirmed_state(Direction::Up);
        let entry_bar = make_bar(32, 110.5, 111.2, 109.5, 111.0);
        let levels = calculator().compute(&state, &entry_bar, 1.5).unwrap();
        assert_approx(levels.entry, 111.0, DEFAULT_EPSILON);
        // Stop just under the broken resistance: 110 - 1.5.
        assert_approx(levels.stop_loss, 108.5, DEFAULT_EPSILON);
        // Target: entry + 2 x width.
        assert_approx(levels.take_profit, 131.0, DEFAULT_EPSILON);
        assert!(levels.stop_loss < levels.entry && levels.entry < levels.take_profit);
    }

    #[test]
    fn down_levels_ordered() {
        let state = confirmed_state(Direction::Down);
        let entry_bar = make_bar(32, 99.5, 100.3, 98.8, 99.0);
        let levels = calculator().compute(&state, &entry_bar, 1.5).unwrap();
        assert_approx(levels.entry, 99.0, DEFAULT_EPSILON);
        assert_approx(levels.stop_loss, 101.5, DEFAULT_EPSILON);
        assert_approx(levels.take_profit, 79.0, DEFAULT_EPSILON);
        assert!(levels.take_profit < levels.entry && levels.entry < levels.stop_loss);
    }

    #[test]
    fn unconfirmed_state_is_rejected() {
        let mut state = confirmed_state(Direction::Up);
        state.status = RetestStatus::AwaitingRetest;
        let entry_bar = make_bar(32, 110.5, 111.2, 109.5, 111.0);
        assert!(matches!(
            calculator().compute(&state, &entry_bar, 1.5),
            Err(LevelError::NotConfirmed { .. })
        ));
    }

    #[test]
    fn violated_ordering_is_rejected_not_corrected() {
        // A huge ATR buffer pushes the stop below the entry for a Down
        // signal's mirror case: entry below the buffered stop is fine, but an
        // entry *above* the stop is not. Force it with an entry close far
        // under the level on an Up signal.
        let state = confirmed_state(Direction::Up);
        // Entry bar closing below the buffered stop (110 - 3 = 107).
        let entry_bar = make_bar(32, 107.0, 110.2, 105.5, 106.0);
        let result = calculator().compute(&state, &entry_bar, 3.0);
        assert!(matches!(result, Err(LevelError::InvalidOrdering { .. })));
    }
}
