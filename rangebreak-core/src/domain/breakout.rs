//! Breakout — a decisive close beyond a range boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Range;

/// Direction of a breakout (and of the signal it may produce).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// +1.0 for Up, -1.0 for Down. Used to write level arithmetic once
    /// for both directions.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// A recognized breakout of a [`Range`].
///
/// Created when a bar closes beyond a boundary by more than the noise margin.
/// At most one breakout exists per range per direction — the engine keys the
/// active retest tracker to this event and refuses duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakout {
    pub range: Range,
    pub direction: Direction,
    /// Timestamp of the bar whose close breached the boundary. Bar
    /// timestamps are strictly increasing per series, so this identifies
    /// the breakout bar even as the fetch window slides.
    pub occurred_at: DateTime<Utc>,
    /// Normalized distance beyond the boundary relative to range width,
    /// clamped to [0, 1].
    pub strength: f64,
}

impl Breakout {
    /// The boundary that was broken: resistance for Up, support for Down.
    pub fn broken_level(&self) -> f64 {
        match self.direction {
            Direction::Up => self.range.resistance,
            Direction::Down => self.range.support,
        }
    }
}
