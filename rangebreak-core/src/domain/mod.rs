//! Domain types: bars, ranges, breakouts, retest lifecycle, signals.
//!
//! Everything here is plain data. Detection and transition logic lives in
//! the sibling modules (`detect`, `retest`, `levels`, `scoring`); the engine
//! owns lifecycle and discards terminal state.

pub mod bar;
pub mod breakout;
pub mod range;
pub mod retest;
pub mod signal;
pub mod timeframe;

pub use bar::Bar;
pub use breakout::{Breakout, Direction};
pub use range::Range;
pub use retest::{RetestState, RetestStatus};
pub use signal::Signal;
pub use timeframe::{ParseTimeframeError, Timeframe};
