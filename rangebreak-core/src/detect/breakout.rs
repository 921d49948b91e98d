//! Breakout classification — a close beyond a range boundary by more than
//! the ATR-scaled noise margin.

use crate::config::EngineConfig;
use crate::domain::{Bar, Breakout, Direction, Range};

#[derive(Debug, Clone)]
pub struct BreakoutClassifier {
    noise_margin_factor: f64,
}

impl BreakoutClassifier {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            noise_margin_factor: config.noise_margin_factor,
        }
    }

    /// Margin a close must clear beyond the boundary. Scales with ATR so a
    /// wick-sized poke through the level does not count as a break.
    pub fn noise_margin(&self, atr: f64) -> f64 {
        self.noise_margin_factor * atr
    }

    /// Classify `bar` against `range`. Returns a breakout when the close is
    /// beyond a boundary by more than the noise margin, `None` otherwise.
    ///
    /// Strength is the distance beyond the boundary relative to range width,
    /// clamped to [0, 1].
    pub fn classify(&self, range: &Range, bar: &Bar, atr: f64) -> Option<Breakout> {
        if !atr.is_finite() {
            return None;
        }
        let margin = self.noise_margin(atr);
        let width = range.width();

        let (direction, distance) = if bar.close > range.resistance + margin {
            (Direction::Up, bar.close - range.resistance)
        } else if bar.close < range.support - margin {
            (Direction::Down, range.support - bar.close)
        } else {
            return None;
        };

        Some(Breakout {
            range: range.clone(),
            direction,
            occurred_at: bar.timestamp,
            strength: (distance / width).clamp(0.0, 1.0),
        })
    }
}
