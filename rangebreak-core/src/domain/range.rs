//! Range — a horizontal consolidation band (support/resistance).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;

/// A detected consolidation range for one (symbol, timeframe) series.
///
/// Invariant: `support < resistance` and `width() >= the detector's minimum
/// width threshold`. Candidates that violate either are discarded inside the
/// detector and never escape as a `Range` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub support: f64,
    pub resistance: f64,
    /// Timestamp of the last bar of the formation window.
    pub formed_at: DateTime<Utc>,
    /// Number of bars in the formation window.
    pub window_len: usize,
    pub support_touches: usize,
    pub resistance_touches: usize,
}

impl Range {
    pub fn width(&self) -> f64 {
        self.resistance - self.support
    }

    /// Midpoint of the band.
    pub fn midpoint(&self) -> f64 {
        (self.support + self.resistance) / 2.0
    }

    /// True if a price sits strictly inside the band.
    pub fn contains(&self, price: f64) -> bool {
        price > self.support && price < self.resistance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_range() -> Range {
        Range {
            symbol: "R_50".into(),
            timeframe: Timeframe::M15,
            support: 100.0,
            resistance: 110.0,
            formed_at: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            window_len: 30,
            support_touches: 3,
            resistance_touches: 2,
        }
    }

    #[test]
    fn width_and_midpoint() {
        let r = sample_range();
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.midpoint(), 105.0);
    }

    #[test]
    fn contains_is_strict() {
        let r = sample_range();
        assert!(r.contains(105.0));
        assert!(!r.contains(100.0));
        assert!(!r.contains(110.0));
        assert!(!r.contains(112.0));
    }
}
