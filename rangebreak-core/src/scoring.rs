//! Confidence scoring — deterministic weighted combination of range quality,
//! breakout strength, retest quality and volatility context into a 1..=10
//! integer gate.

use crate::config::{EngineConfig, ScoringWeights};
use crate::domain::{Range, RetestState};

/// Normalized score components, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub range_quality: f64,
    pub breakout_strength: f64,
    pub retest_quality: f64,
    pub volatility_context: f64,
}

impl ScoreInputs {
    pub fn new(
        range_quality: f64,
        breakout_strength: f64,
        retest_quality: f64,
        volatility_context: f64,
    ) -> Self {
        Self {
            range_quality: range_quality.clamp(0.0, 1.0),
            breakout_strength: breakout_strength.clamp(0.0, 1.0),
            retest_quality: retest_quality.clamp(0.0, 1.0),
            volatility_context: volatility_context.clamp(0.0, 1.0),
        }
    }
}

/// Touches beyond this per boundary add no further quality.
const TOUCH_SATURATION: usize = 4;
/// Formation-window length treated as "fully formed" for the duration term.
const FULL_FORMATION_BARS: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    /// Weights are validated at config time (must sum to 1.0); the scorer
    /// trusts them.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            weights: config.weights,
        }
    }

    /// Weighted sum scaled to 1..=10. Rounds to nearest integer, clamps the
    /// floor to 1 so even a weak-but-emittable candidate has a score.
    pub fn score(&self, inputs: &ScoreInputs) -> u8 {
        let weighted = self.weights.range * inputs.range_quality
            + self.weights.breakout * inputs.breakout_strength
            + self.weights.retest * inputs.retest_quality
            + self.weights.volatility * inputs.volatility_context;
        let rounded = (10.0 * weighted).round() as i64;
        rounded.clamp(1, 10) as u8
    }
}

/// Range quality from boundary touches (saturating) and formation length.
pub fn range_quality(range: &Range) -> f64 {
    let touches = range.support_touches.min(TOUCH_SATURATION)
        + range.resistance_touches.min(TOUCH_SATURATION);
    let touch_q = touches as f64 / (2 * TOUCH_SATURATION) as f64;
    let duration_q = (range.window_len as f64 / FULL_FORMATION_BARS).min(1.0);
    0.6 * touch_q + 0.4 * duration_q
}

/// Retest quality: how precisely price returned to the level (closer is
/// better) and how quickly it confirmed (fewer bars is better).
pub fn retest_quality(state: &RetestState, band: f64, max_wait_bars: usize) -> f64 {
    let precision = match state.closest_approach {
        Some(distance) if band > 0.0 => 1.0 - (distance / band).clamp(0.0, 1.0),
        _ => 0.0,
    };
    let speed = match state.bars_to_confirm() {
        Some(bars) if max_wait_bars > 0 => {
            1.0 - (bars.saturating_sub(1) as f64 / max_wait_bars as f64).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };
    0.6 * precision + 0.4 * speed
}

/// Volatility context: 1.0 while current volatility is at or below the
/// rolling baseline, shrinking toward 0 as the current ATR spikes above it
/// (possible news event). Neutral 0.5 when no baseline is available.
pub fn volatility_context(current_atr: f64, baseline_atr: f64) -> f64 {
    if !current_atr.is_finite() || !baseline_atr.is_finite() || baseline_atr <= 0.0 {
        return 0.5;
    }
    if current_atr <= baseline_atr {
        1.0
    } else {
        (baseline_atr / current_atr).clamp(0.0, 1.0)
    }
}
