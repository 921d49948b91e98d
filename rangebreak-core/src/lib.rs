//! RangeBreak Core — breakout & retest signal engine for synthetic indices.
//!
//! The heart of the crate:
//! - Domain types (bars, ranges, breakouts, retest lifecycle, signals)
//! - Range detection over a rolling formation window
//! - Breakout classification with an ATR-scaled noise margin
//! - Retest state machine (awaiting / confirmed / failed / expired)
//! - Entry/stop/target calculation with a validated ordering invariant
//! - Deterministic 1..=10 confidence scoring with a configurable gate
//! - Per-pair engine orchestration with isolated, parallelizable state
//! - Bar feed and AI-approval oracle seams for the external collaborators

pub mod approval;
pub mod config;
pub mod detect;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod levels;
pub mod retest;
pub mod scoring;

pub use approval::{submit_for_approval, ApprovalOracle, ApprovalVerdict, FixedOracle};
pub use config::{ConfigError, EngineConfig, ScoringWeights};
pub use domain::{Bar, Breakout, Direction, Range, RetestState, RetestStatus, Signal, Timeframe};
pub use engine::{PairKey, SignalEngine};
pub use feed::{BarFeed, FeedError, InMemoryFeed, SyntheticFeed};
