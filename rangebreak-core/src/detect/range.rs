//! Range detection — rolling extremes over a formation window, with touch
//! counting to reject single-spike "ranges".
//!
//! Recomputed from the current window each evaluation tick, so when candidate
//! windows overlap, the most recently formed extremes win by construction.

use crate::config::EngineConfig;
use crate::domain::{Bar, Range, Timeframe};

#[derive(Debug, Clone)]
pub struct RangeDetector {
    lookback: usize,
    min_touches: usize,
    touch_tolerance_frac: f64,
    min_width: f64,
    min_atr_mult: f64,
}

impl RangeDetector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            lookback: config.range_lookback,
            min_touches: config.min_boundary_touches,
            touch_tolerance_frac: config.touch_tolerance_frac,
            min_width: config.min_range_width,
            min_atr_mult: config.min_range_atr_mult,
        }
    }

    /// Detect the current range from the trailing `lookback` bars of `bars`.
    ///
    /// Returns `None` when the window is short, too narrow, or price has not
    /// touched both boundaries often enough. Insufficient bars is not an
    /// error — the series simply has no range yet.
    ///
    /// `atr` scales the minimum width so ranges widen with instrument
    /// volatility; a NaN ATR falls back to the absolute floor alone.
    pub fn detect(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[Bar],
        atr: f64,
    ) -> Option<Range> {
        if bars.len() < self.lookback {
            return None;
        }
        let window = &bars[bars.len() - self.lookback..];

        let resistance = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let support = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let width = resistance - support;

        let min_width = if atr.is_finite() {
            self.min_width.max(self.min_atr_mult * atr)
        } else {
            self.min_width
        };
        if width <= 0.0 || width < min_width {
            return None;
        }

        let band = self.touch_tolerance_frac * width;
        let resistance_touches = window.iter().filter(|b| b.high >= resistance - band).count();
        let support_touches = window.iter().filter(|b| b.low <= support + band).count();
        if resistance_touches < self.min_touches || support_touches < self.min_touches {
            return None;
        }

        Some(Range {
            symbol: symbol.to_string(),
            timeframe,
            support,
            resistance,
            formed_at: window[window.len() - 1].timestamp,
            window_len: self.lookback,
            support_touches,
            resistance_touches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_ranging_bars;

    fn detector(lookback: usize) -> RangeDetector {
        let mut config = EngineConfig::default();
        config.range_lookback = lookback;
        RangeDetector::from_config(&config)
    }

    #[test]
    fn detects_well_formed_range() {
        // Oscillation between 100 and 110, touching each side repeatedly.
        let bars = make_ranging_bars(30, 100.0, 110.0);
        let range = detector(30)
            .detect("R_50", Timeframe::M15, &bars, 2.0)
            .unwrap();
        assert_eq!(range.support, 100.0);
        assert_eq!(range.resistance, 110.0);
        assert!(range.support_touches >= 2);
        assert!(range.resistance_touches >= 2);
        assert_eq!(range.formed_at, bars[29].timestamp);
        assert!(range.support < range.resistance);
    }

    #[test]
    fn insufficient_bars_is_none() {
        let bars = make_ranging_bars(10, 100.0, 110.0);
        assert!(detector(30)
            .detect("R_50", Timeframe::M15, &bars, 2.0)
            .is_none());
    }

    #[test]
    fn rejects_single_spike_boundary() {
        // Flat series with one spike high: resistance touched only once.
        let mut bars = make_ranging_bars(30, 100.0, 104.0);
        for bar in bars.iter_mut() {
            bar.high = bar.high.min(104.0);
        }
        bars[12].high = 120.0;
        assert!(detector(30)
            .detect("R_50", Timeframe::M15, &bars, 2.0)
            .is_none());
    }

    #[test]
    fn rejects_too_narrow_for_volatility() {
        // Width 10 but ATR 8 with mult 1.5 requires width >= 12.
        let bars = make_ranging_bars(30, 100.0, 110.0);
        assert!(detector(30)
            .detect("R_50", Timeframe::M15, &bars, 8.0)
            .is_none());
    }

    #[test]
    fn absolute_floor_applies_without_atr() {
        let bars = make_ranging_bars(30, 100.0, 110.0);
        let mut config = EngineConfig::default();
        config.range_lookback = 30;
        config.min_range_width = 15.0;
        let det = RangeDetector::from_config(&config);
        assert!(det
            .detect("R_50", Timeframe::M15, &bars, f64::NAN)
            .is_none());

        config.min_range_width = 5.0;
        let det = RangeDetector::from_config(&config);
        assert!(det
            .detect("R_50", Timeframe::M15, &bars, f64::NAN)
            .is_some());
    }

    #[test]
    fn uses_trailing_window_only() {
        // Old wide swings followed by a tight recent band: the detector only
        // sees the trailing window, so the recent band wins.
        let mut bars = make_ranging_bars(50, 100.0, 110.0);
        for bar in bars.iter_mut().take(20) {
            bar.high += 40.0;
            bar.low -= 50.0;
        }
        let range = detector(30)
            .detect("R_50", Timeframe::M15, &bars, 2.0)
            .unwrap();
        assert_eq!(range.support, 100.0);
        assert_eq!(range.resistance, 110.0);
        assert_eq!(range.formed_at, bars[49].timestamp);
    }
}
