//! Signal — the engine's output: a fully-specified trade candidate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, Range, Timeframe};

/// An emitted trade signal.
///
/// Immutable once created; emitted at most once per resolved retest. Level
/// geometry is validated before construction (Up: stop < entry < target,
/// Down: target < entry < stop), so consumers can rely on the ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Composite quality rating, 1..=10.
    pub confidence: u8,
    /// The range whose breakout produced this signal.
    pub range: Range,
    /// Timestamp of the confirming bar. Taken from the bar, not the wall
    /// clock, so replays of the same series produce identical signals.
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// Content-addressable id: blake3 over the serialized signal.
    ///
    /// Two identical signals (same series, same config) hash identically,
    /// which lets callers de-duplicate across repeated evaluation ticks.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("Signal serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Flatten to key/value pairs for caller-side logging or storage.
    /// No binary format is defined; this is the only export shape the
    /// engine commits to.
    pub fn to_flat_record(&self) -> Vec<(String, String)> {
        vec![
            ("symbol".into(), self.symbol.clone()),
            ("timeframe".into(), self.timeframe.to_string()),
            ("direction".into(), self.direction.as_str().into()),
            ("entry_price".into(), format!("{:.5}", self.entry_price)),
            ("stop_loss".into(), format!("{:.5}", self.stop_loss)),
            ("take_profit".into(), format!("{:.5}", self.take_profit)),
            ("confidence".into(), self.confidence.to_string()),
            ("support".into(), format!("{:.5}", self.range.support)),
            ("resistance".into(), format!("{:.5}", self.range.resistance)),
            ("created_at".into(), self.created_at.to_rfc3339()),
        ]
    }
}
