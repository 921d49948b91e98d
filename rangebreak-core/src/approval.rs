//! AI approval oracle — the external gate a candidate signal passes through
//! before delivery.
//!
//! The core never talks to a model itself; it defines the contract and a test
//! double. `evaluate()` stays pure and synchronous — submitting for approval
//! is the only place the surrounding system suspends, and a timeout or
//! failure yields an unapproved verdict, never an error out of the core.
//! Retry policy belongs to the caller.

use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::domain::Signal;

/// Verdict returned by the oracle for one candidate signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalVerdict {
    pub approved: bool,
    /// Oracle's own confidence, 0..=10.
    pub score: u8,
    pub reasoning: String,
}

impl ApprovalVerdict {
    /// The verdict used when the oracle cannot be reached: the signal is
    /// reported as unapproved, and the caller decides whether to retry.
    pub fn unapproved(reasoning: impl Into<String>) -> Self {
        Self {
            approved: false,
            score: 0,
            reasoning: reasoning.into(),
        }
    }
}

/// Oracle-side failures. These never escape `submit_for_approval`.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval request timed out after {0:?}")]
    Timeout(Duration),

    #[error("approval oracle unavailable: {0}")]
    Unavailable(String),

    #[error("unparseable oracle response: {0}")]
    MalformedResponse(String),
}

/// Contract the external AI approval collaborator must satisfy.
///
/// The call is synchronous from the core's point of view; the implementation
/// owns any await points and its caller-imposed timeout.
pub trait ApprovalOracle: Send + Sync {
    fn request_approval(&self, signal: &Signal) -> Result<ApprovalVerdict, ApprovalError>;
}

/// Submit a signal for approval, applying the configured minimum score.
///
/// A verdict only counts as approved when the oracle approves *and* its
/// score reaches `min_score`. Oracle failure maps to unapproved.
pub fn submit_for_approval(
    oracle: &dyn ApprovalOracle,
    signal: &Signal,
    min_score: u8,
) -> ApprovalVerdict {
    match oracle.request_approval(signal) {
        Ok(mut verdict) => {
            verdict.approved = verdict.approved && verdict.score >= min_score;
            verdict
        }
        Err(err) => {
            warn!(
                symbol = %signal.symbol,
                timeframe = %signal.timeframe,
                error = %err,
                "approval oracle failed; treating signal as unapproved"
            );
            ApprovalVerdict::unapproved(format!("oracle failure: {err}"))
        }
    }
}

/// Extract a 0..=10 confidence score from free-text oracle output.
///
/// Accepts the structured `CONFIDENCE: X/10` form as well as a bare `X/10`
/// anywhere in the text. Out-of-range values are rejected.
pub fn parse_confidence_score(text: &str) -> Option<u8> {
    let upper = text.to_uppercase();
    if let Some(rest) = upper.split("CONFIDENCE:").nth(1) {
        if let Some(score) = leading_score(rest) {
            return Some(score);
        }
    }
    // Fallback: first "X/10" occurrence.
    for (idx, _) in upper.match_indices("/10") {
        let head = &upper[..idx];
        let digits: String = head
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let digits: String = digits.chars().rev().collect();
        if let Ok(value) = digits.parse::<u8>() {
            if value <= 10 {
                return Some(value);
            }
        }
    }
    None
}

fn leading_score(rest: &str) -> Option<u8> {
    let trimmed = rest.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    let value = digits.parse::<u8>().ok()?;
    (value <= 10).then_some(value)
}

/// Fixed-verdict oracle for tests and the demo command.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    pub approve: bool,
    pub score: u8,
    pub reasoning: String,
}

impl FixedOracle {
    pub fn approving(score: u8) -> Self {
        Self {
            approve: true,
            score,
            reasoning: "fixed oracle".into(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            approve: false,
            score: 0,
            reasoning: "fixed oracle".into(),
        }
    }
}

impl ApprovalOracle for FixedOracle {
    fn request_approval(&self, _signal: &Signal) -> Result<ApprovalVerdict, ApprovalError> {
        Ok(ApprovalVerdict {
            approved: self.approve,
            score: self.score,
            reasoning: self.reasoning.clone(),
        })
    }
}

/// Oracle that always fails; exercises the unapproved-on-failure path.
#[derive(Debug, Clone, Copy)]
pub struct UnreachableOracle;

impl ApprovalOracle for UnreachableOracle {
    fn request_approval(&self, _signal: &Signal) -> Result<ApprovalVerdict, ApprovalError> {
        Err(ApprovalError::Timeout(Duration::from_secs(10)))
    }
}
