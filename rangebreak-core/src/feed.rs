//! Bar feed abstraction and structured error types.
//!
//! The `BarFeed` trait abstracts over bar sources (live market-data bridge,
//! in-memory replay, synthetic generation) so the engine can be driven and
//! tested without any transport. The live WebSocket client is an external
//! collaborator; it appends into an `InMemoryFeed` owned by the host.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{Bar, Timeframe};

/// Structured error types for feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no data available for {symbol} {timeframe}")]
    DataUnavailable { symbol: String, timeframe: Timeframe },

    #[error("bar for {symbol} {timeframe} is not after the previous bar")]
    OutOfOrder { symbol: String, timeframe: Timeframe },

    #[error("rejected insane bar for {symbol} {timeframe} (OHLC inconsistent)")]
    InvalidBar { symbol: String, timeframe: Timeframe },
}

/// Trait for bar sources.
///
/// Returned series are ascending by timestamp with no gaps or duplicates.
/// `count` is the maximum window the caller wants; a feed may return fewer
/// bars than requested, and the engine decides whether that is enough.
pub trait BarFeed: Send + Sync {
    /// The most recent `count` bars for one (symbol, timeframe) pair.
    ///
    /// Fails with [`FeedError::DataUnavailable`] when the pair is unknown or
    /// has no bars at all.
    fn bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>, FeedError>;
}

/// In-memory append-only feed.
///
/// One producer appends per (symbol, timeframe); reads take a snapshot of the
/// tail. Ordering and OHLC sanity are enforced on append so consumers never
/// re-validate.
#[derive(Debug, Default)]
pub struct InMemoryFeed {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bar. Rejects out-of-order timestamps and insane OHLC.
    pub fn push(&mut self, symbol: &str, timeframe: Timeframe, bar: Bar) -> Result<(), FeedError> {
        if !bar.is_sane() {
            return Err(FeedError::InvalidBar {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        let series = self
            .series
            .entry((symbol.to_string(), timeframe))
            .or_default();
        if let Some(last) = series.last() {
            if bar.timestamp <= last.timestamp {
                return Err(FeedError::OutOfOrder {
                    symbol: symbol.to_string(),
                    timeframe,
                });
            }
        }
        series.push(bar);
        Ok(())
    }

    /// Append a whole series (replay ingestion).
    pub fn extend(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        bars: impl IntoIterator<Item = Bar>,
    ) -> Result<(), FeedError> {
        for bar in bars {
            self.push(symbol, timeframe, bar)?;
        }
        Ok(())
    }

    pub fn len(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.series
            .get(&(symbol.to_string(), timeframe))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.len(symbol, timeframe) == 0
    }
}

impl BarFeed for InMemoryFeed {
    fn bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>, FeedError> {
        let series = self
            .series
            .get(&(symbol.to_string(), timeframe))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FeedError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe,
            })?;
        let start = series.len().saturating_sub(count);
        Ok(series[start..].to_vec())
    }
}

/// Per-bar volatility scale for a synthetic index symbol, as a fraction of
/// price. Deriv's volatility indices encode their annualized volatility in
/// the name; boom/crash indices move less bar to bar.
pub fn volatility_for_symbol(symbol: &str) -> f64 {
    match symbol {
        "R_10" => 0.0006,
        "R_25" => 0.0015,
        "R_50" => 0.003,
        "R_75" => 0.0045,
        "R_100" => 0.006,
        s if s.starts_with("BOOM") || s.starts_with("CRASH") => 0.001,
        _ => 0.003,
    }
}

/// Deterministic synthetic bar series: alternating consolidation and trend
/// phases, so ranges actually form and break during demos and benches.
///
/// Seeded; the same (symbol, seed, count) always yields the same series.
pub struct SyntheticFeed {
    inner: InMemoryFeed,
}

impl SyntheticFeed {
    pub fn generate(symbol: &str, timeframe: Timeframe, count: usize, seed: u64) -> Self {
        let bars = synthetic_bars(symbol, timeframe, count, seed);
        let mut inner = InMemoryFeed::new();
        // Generated bars are sane and ascending by construction.
        inner
            .extend(symbol, timeframe, bars)
            .expect("synthetic series must be valid");
        Self { inner }
    }
}

impl BarFeed for SyntheticFeed {
    fn bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>, FeedError> {
        self.inner.bars(symbol, timeframe, count)
    }
}

/// Build the raw synthetic series. Consolidation phases oscillate inside a
/// band; breakout phases drift directionally to a new level.
pub fn synthetic_bars(symbol: &str, timeframe: Timeframe, count: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_price = 1000.0;
    let step = base_price * volatility_for_symbol(symbol);
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut bars = Vec::with_capacity(count);
    let mut price = base_price;
    let mut anchor = base_price;
    let mut phase_left = 0usize;
    let mut trending: Option<f64> = None;

    for i in 0..count {
        if phase_left == 0 {
            if trending.is_some() || rng.gen_bool(0.6) {
                // Enter consolidation around the current price.
                trending = None;
                anchor = price;
                phase_left = rng.gen_range(25..50);
            } else {
                // Enter a trend phase; direction is a coin flip.
                trending = Some(if rng.gen_bool(0.5) { 1.0 } else { -1.0 });
                phase_left = rng.gen_range(5..15);
            }
        }
        phase_left -= 1;

        let open = price;
        let drift = match trending {
            Some(dir) => dir * step * rng.gen_range(0.5..1.5),
            // Mean-revert toward the anchor inside the band.
            None => (anchor - price) * 0.3 + step * rng.gen_range(-1.0..1.0),
        };
        let close = (open + drift).max(step);
        let wick = step * rng.gen_range(0.1..0.6);
        let high = open.max(close) + wick;
        let low = (open.min(close) - wick).max(step / 2.0);

        bars.push(Bar {
            timestamp: start + timeframe.duration() * i as i32,
            open,
            high,
            low,
            close,
        });
        price = close;
    }
    bars
}
