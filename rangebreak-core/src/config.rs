//! Engine configuration and fail-fast validation.
//!
//! All tuning constants (noise margin, retest tolerance, scoring weights)
//! are product-tuning values with no derivation — they are configuration,
//! never hard-coded. The engine refuses to start on an invalid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Weights for the four confidence components. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub range: f64,
    pub breakout: f64,
    pub retest: f64,
    pub volatility: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.range + self.breakout + self.retest + self.volatility
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            range: 0.30,
            breakout: 0.25,
            retest: 0.30,
            volatility: 0.15,
        }
    }
}

/// Full configuration surface of the signal engine.
///
/// Loadable from TOML; `#[serde(default)]` means a config file only needs to
/// name the options it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bars in the range-formation window.
    pub range_lookback: usize,
    /// Minimum touches required on each boundary for a valid range.
    pub min_boundary_touches: usize,
    /// Touch band around each boundary, as a fraction of range width.
    pub touch_tolerance_frac: f64,
    /// Absolute floor on range width (price units).
    pub min_range_width: f64,
    /// Volatility-scaled floor on range width: width must exceed this
    /// multiple of ATR so ranges scale with instrument volatility.
    pub min_range_atr_mult: f64,
    /// ATR period for the noise margin and stop buffer.
    pub atr_period: usize,
    /// Noise margin = this factor x ATR. Filters wicks from genuine breaks.
    pub noise_margin_factor: f64,
    /// Retest band around the broken level, as a fraction of range width.
    pub retest_tolerance: f64,
    /// Bars a breakout may wait for its retest before expiring.
    pub max_wait_bars: usize,
    /// Stop buffer = this multiple of ATR past the broken level.
    pub stop_buffer_atr_mult: f64,
    /// Take profit = entry +/- this multiple of range width.
    pub risk_reward_ratio: f64,
    pub weights: ScoringWeights,
    /// Candidates scoring below this are discarded before approval. 1..=10.
    pub min_signal_confidence: u8,
    /// Oracle score required for an approved verdict. 1..=10.
    pub ai_approval_min_score: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            range_lookback: 30,
            min_boundary_touches: 2,
            touch_tolerance_frac: 0.10,
            min_range_width: 0.0,
            min_range_atr_mult: 1.5,
            atr_period: 14,
            noise_margin_factor: 0.15,
            retest_tolerance: 0.25,
            max_wait_bars: 15,
            stop_buffer_atr_mult: 1.0,
            risk_reward_ratio: 2.0,
            weights: ScoringWeights::default(),
            min_signal_confidence: 6,
            ai_approval_min_score: 7,
        }
    }
}

/// Configuration errors. Fatal at startup: the engine must not begin
/// evaluating with a config that fails any of these checks.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scoring weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("{name} must be within 1..=10, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: u8 },

    #[error("{name} must be a fraction in (0, 1), got {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be nonzero")]
    ZeroLookback { name: &'static str },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

const WEIGHT_SUM_EPSILON: f64 = 1e-6;

impl EngineConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::WeightSum { sum });
        }
        for (name, weight) in [
            ("weights.range", self.weights.range),
            ("weights.breakout", self.weights.breakout),
            ("weights.retest", self.weights.retest),
            ("weights.volatility", self.weights.volatility),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidFraction { name, value: weight });
            }
        }
        for (name, value) in [
            ("min_signal_confidence", self.min_signal_confidence),
            ("ai_approval_min_score", self.ai_approval_min_score),
        ] {
            if !(1..=10).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("touch_tolerance_frac", self.touch_tolerance_frac),
            ("retest_tolerance", self.retest_tolerance),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidFraction { name, value });
            }
        }
        for (name, value) in [
            ("noise_margin_factor", self.noise_margin_factor),
            ("stop_buffer_atr_mult", self.stop_buffer_atr_mult),
            ("risk_reward_ratio", self.risk_reward_ratio),
            ("min_range_atr_mult", self.min_range_atr_mult),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.min_range_width < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "min_range_width",
                value: self.min_range_width,
            });
        }
        for (name, value) in [
            ("range_lookback", self.range_lookback),
            ("min_boundary_touches", self.min_boundary_touches),
            ("atr_period", self.atr_period),
            ("max_wait_bars", self.max_wait_bars),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLookback { name });
            }
        }
        Ok(())
    }

    /// Minimum bars a series must supply before a tick can be evaluated:
    /// the range window, one breakout bar, and enough history for ATR.
    pub fn min_bars(&self) -> usize {
        (self.range_lookback + 1).max(self.atr_period + 1)
    }

    /// Bars requested from the feed per tick. Extra history beyond the
    /// minimum stabilizes the volatility baseline.
    pub fn fetch_bars(&self) -> usize {
        self.min_bars() + 3 * self.atr_period
    }
}
