//! Per-pair evaluation state.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{Range, Timeframe};
use crate::retest::RetestTracker;

/// Key for one independently-evaluated series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl PairKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.timeframe)
    }
}

/// Mutable state the engine keeps per (symbol, timeframe).
///
/// This is the whole of it: the current range, at most one live retest
/// tracker, and the timestamp of the last resolved breakout bar (which makes
/// breakout recognition idempotent across repeated ticks). Pair state is
/// private to its pair — nothing here is shared across pairs.
#[derive(Debug, Default)]
pub struct PairState {
    pub range: Option<Range>,
    pub tracker: Option<RetestTracker>,
    /// Timestamp of the bar on which the last tracker resolved (or was
    /// superseded). New breakouts must come from a later bar.
    pub last_resolved: Option<DateTime<Utc>>,
}

impl PairState {
    pub fn has_active_tracker(&self) -> bool {
        self.tracker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_display() {
        let key = PairKey::new("R_50", Timeframe::M15);
        assert_eq!(key.to_string(), "R_50/15m");
    }

    #[test]
    fn pair_keys_distinguish_timeframes() {
        let a = PairKey::new("R_50", Timeframe::M15);
        let b = PairKey::new("R_50", Timeframe::H1);
        assert_ne!(a, b);
    }

    #[test]
    fn default_state_is_idle() {
        let state = PairState::default();
        assert!(state.range.is_none());
        assert!(!state.has_active_tracker());
        assert_eq!(state.last_resolved, None);
    }
}
