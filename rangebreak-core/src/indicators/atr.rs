//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing (EMA with alpha = 1/period) seeded from the
//! mean of the first `period` true ranges. Needs period+1 bars.

use crate::domain::Bar;

/// Compute the True Range series from bars.
///
/// TR[0] is NaN — there is no previous close, so the first bar has no proper
/// true range. TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|,
/// |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Latest Wilder-smoothed ATR over `period`. Returns NaN when fewer than
/// `period + 1` bars are available — callers treat NaN as "no volatility
/// estimate yet" and skip the tick.
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period + 1 {
        return f64::NAN;
    }
    let tr = true_range(bars);

    // Seed from TR[1..=period], then smooth the remainder.
    let seed: f64 = tr[1..=period].iter().sum::<f64>() / period as f64;
    let alpha = 1.0 / period as f64;
    let mut value = seed;
    for &t in &tr[period + 1..] {
        value = alpha * t + (1.0 - alpha) * value;
    }
    value
}

/// Simple mean of the last `window` true ranges. Used as the rolling
/// volatility baseline that the confidence scorer compares the current ATR
/// against. Returns NaN when fewer than `window + 1` bars are available.
pub fn mean_true_range(bars: &[Bar], window: usize) -> f64 {
    if window == 0 || bars.len() < window + 1 {
        return f64::NAN;
    }
    let tr = true_range(bars);
    let tail = &tr[tr.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}
