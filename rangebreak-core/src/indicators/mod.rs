//! Volatility indicators feeding the detection pipeline.
//!
//! Only ATR-family computations live here: the noise margin, the minimum
//! range width, the stop buffer, and the volatility-context score are all
//! derived from true range.

pub mod atr;

pub use atr::{atr, mean_true_range, true_range};
