//! Detection pipeline: range formation and breakout classification.

pub mod breakout;
pub mod range;

pub use breakout::BreakoutClassifier;
pub use range::RangeDetector;
