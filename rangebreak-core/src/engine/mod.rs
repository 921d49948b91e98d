//! Signal engine — per-tick orchestration of detection, retest tracking,
//! level calculation and confidence scoring.
//!
//! Phases per evaluation tick for one (symbol, timeframe):
//!
//! 1. Fetch the bar window; skip the tick on `DataUnavailable`.
//! 2. If a tracker is live, advance it one bar; a confirmed retest flows into
//!    levels + scoring, a failed one may be superseded by an opposing
//!    breakout, an expired one is discarded.
//! 3. Otherwise refresh the range and classify the latest bar against it.
//!
//! Pairs are independent: `evaluate_all` runs them in parallel and a failure
//! in one pair never affects another.

pub mod state;

pub use state::{PairKey, PairState};

use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::detect::{BreakoutClassifier, RangeDetector};
use crate::domain::{Bar, Breakout, RetestState, RetestStatus, Signal, Timeframe};
use crate::feed::BarFeed;
use crate::indicators;
use crate::levels::LevelCalculator;
use crate::retest::RetestTracker;
use crate::scoring::{self, ConfidenceScorer, ScoreInputs};

pub struct SignalEngine {
    config: EngineConfig,
    detector: RangeDetector,
    classifier: BreakoutClassifier,
    levels: LevelCalculator,
    scorer: ConfidenceScorer,
    pairs: HashMap<PairKey, PairState>,
}

impl SignalEngine {
    /// Build an engine from a config. Fails fast on an invalid config —
    /// the engine must not start evaluating with bad weights or thresholds.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            detector: RangeDetector::from_config(&config),
            classifier: BreakoutClassifier::from_config(&config),
            levels: LevelCalculator::from_config(&config),
            scorer: ConfidenceScorer::from_config(&config),
            config,
            pairs: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a pair for `evaluate_all`. Idempotent.
    pub fn watch(&mut self, symbol: &str, timeframe: Timeframe) {
        self.pairs
            .entry(PairKey::new(symbol, timeframe))
            .or_default();
    }

    pub fn watched_pairs(&self) -> impl Iterator<Item = &PairKey> {
        self.pairs.keys()
    }

    /// Evaluate one pair for the current tick. Returns at most one signal.
    ///
    /// `DataUnavailable` (and any other feed failure) skips the tick; it is
    /// not fatal and leaves the pair state untouched.
    pub fn evaluate(
        &mut self,
        feed: &dyn BarFeed,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Option<Signal> {
        let key = PairKey::new(symbol, timeframe);
        let bars = match feed.bars(symbol, timeframe, self.config.fetch_bars()) {
            Ok(bars) => bars,
            Err(err) => {
                debug!(pair = %key, error = %err, "tick skipped: no data");
                return None;
            }
        };
        let mut state = self.pairs.remove(&key).unwrap_or_default();
        let signal = self.evaluate_pair(&key, &mut state, &bars);
        self.pairs.insert(key, state);
        signal
    }

    /// Evaluate every watched pair, in parallel.
    ///
    /// Pair states are disjoint, so pairs run on rayon without locks. A
    /// panic inside one pair's evaluation is caught, that pair's state is
    /// reset, and the remaining pairs are unaffected.
    pub fn evaluate_all(&mut self, feed: &dyn BarFeed) -> Vec<Signal> {
        let mut pairs = std::mem::take(&mut self.pairs);
        let fetch = self.config.fetch_bars();

        let mut signals: Vec<Signal> = pairs
            .par_iter_mut()
            .filter_map(|(key, state)| {
                let bars = match feed.bars(&key.symbol, key.timeframe, fetch) {
                    Ok(bars) => bars,
                    Err(err) => {
                        debug!(pair = %key, error = %err, "tick skipped: no data");
                        return None;
                    }
                };
                match catch_unwind(AssertUnwindSafe(|| {
                    self.evaluate_pair(key, state, &bars)
                })) {
                    Ok(signal) => signal,
                    Err(_) => {
                        warn!(pair = %key, "evaluation panicked; pair state reset");
                        *state = PairState::default();
                        None
                    }
                }
            })
            .collect();

        self.pairs = pairs;
        // Parallel collection order is nondeterministic; emit stable output.
        signals.sort_by(|a, b| (&a.symbol, a.timeframe.as_str()).cmp(&(&b.symbol, b.timeframe.as_str())));
        signals
    }

    fn evaluate_pair(&self, key: &PairKey, state: &mut PairState, bars: &[Bar]) -> Option<Signal> {
        if bars.len() < self.config.min_bars() {
            debug!(
                pair = %key,
                bars = bars.len(),
                needed = self.config.min_bars(),
                "tick skipped: insufficient bars"
            );
            return None;
        }
        let last = bars.len() - 1;
        let latest = &bars[last];
        let current_atr = indicators::atr(bars, self.config.atr_period);
        if !current_atr.is_finite() {
            return None;
        }
        let noise_margin = self.classifier.noise_margin(current_atr);

        if let Some(mut tracker) = state.tracker.take() {
            let status = tracker.advance(latest, noise_margin);
            return match status {
                RetestStatus::AwaitingRetest => {
                    state.tracker = Some(tracker);
                    None
                }
                RetestStatus::RetestConfirmed => {
                    let resolved = tracker.into_state();
                    state.range = None;
                    state.last_resolved = Some(latest.timestamp);
                    info!(
                        pair = %key,
                        direction = resolved.breakout.direction.as_str(),
                        level = resolved.breakout.broken_level(),
                        "retest confirmed"
                    );
                    self.emit(key, &resolved, latest, bars, current_atr)
                }
                RetestStatus::RetestFailed => {
                    let failed = tracker.into_state();
                    debug!(
                        pair = %key,
                        direction = failed.breakout.direction.as_str(),
                        "breakout failed: price reversed through the range"
                    );
                    // An opposing break on the reversal bar supersedes the
                    // discarded tracker.
                    if let Some(opposing) =
                        self.classifier
                            .classify(&failed.breakout.range, latest, current_atr)
                    {
                        if opposing.direction == failed.breakout.direction.opposite()
                            && self.accept_breakout(state, &opposing)
                        {
                            info!(
                                pair = %key,
                                direction = opposing.direction.as_str(),
                                strength = opposing.strength,
                                "opposing breakout supersedes failed tracker"
                            );
                            state.tracker = Some(RetestTracker::new(opposing, &self.config));
                        }
                    }
                    state.last_resolved = Some(latest.timestamp);
                    None
                }
                RetestStatus::Expired => {
                    debug!(pair = %key, "retest window expired without resolution");
                    state.last_resolved = Some(latest.timestamp);
                    None
                }
            };
        }

        // No live tracker: refresh the range from the bars before the latest
        // one, then classify the latest close against it.
        let window = &bars[..last];
        let window_atr = indicators::atr(window, self.config.atr_period);
        state.range = self
            .detector
            .detect(&key.symbol, key.timeframe, window, window_atr);
        if let Some(range) = &state.range {
            if let Some(breakout) = self.classifier.classify(range, latest, current_atr) {
                if self.accept_breakout(state, &breakout) {
                    info!(
                        pair = %key,
                        direction = breakout.direction.as_str(),
                        strength = breakout.strength,
                        support = range.support,
                        resistance = range.resistance,
                        "breakout detected; awaiting retest"
                    );
                    state.tracker = Some(RetestTracker::new(breakout, &self.config));
                }
            }
        }
        None
    }

    /// A breakout is recognized once: repeated ticks over unchanged data
    /// re-present the bar that already resolved, and must not restart a
    /// tracker for it.
    fn accept_breakout(&self, state: &PairState, breakout: &Breakout) -> bool {
        match state.last_resolved {
            Some(resolved) => breakout.occurred_at > resolved,
            None => true,
        }
    }

    /// Levels, scoring and the confidence gate for a confirmed retest.
    fn emit(
        &self,
        key: &PairKey,
        resolved: &RetestState,
        entry_bar: &Bar,
        bars: &[Bar],
        current_atr: f64,
    ) -> Option<Signal> {
        let levels = match self.levels.compute(resolved, entry_bar, current_atr) {
            Ok(levels) => levels,
            Err(err) => {
                warn!(pair = %key, error = %err, "signal suppressed: invalid levels");
                return None;
            }
        };

        let breakout = &resolved.breakout;
        let band = self.config.retest_tolerance * breakout.range.width();
        let baseline = indicators::mean_true_range(bars, 3 * self.config.atr_period);
        let inputs = ScoreInputs::new(
            scoring::range_quality(&breakout.range),
            breakout.strength,
            scoring::retest_quality(resolved, band, self.config.max_wait_bars),
            scoring::volatility_context(current_atr, baseline),
        );
        let confidence = self.scorer.score(&inputs);
        if confidence < self.config.min_signal_confidence {
            debug!(
                pair = %key,
                confidence,
                min = self.config.min_signal_confidence,
                "candidate discarded below confidence gate"
            );
            return None;
        }

        let signal = Signal {
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            direction: breakout.direction,
            entry_price: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            confidence,
            range: breakout.range.clone(),
            created_at: entry_bar.timestamp,
        };
        info!(
            pair = %key,
            direction = signal.direction.as_str(),
            entry = signal.entry_price,
            stop = signal.stop_loss,
            target = signal.take_profit,
            confidence,
            "signal emitted"
        );
        Some(signal)
    }
}
