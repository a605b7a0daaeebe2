//! Search driver error types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interpreter::RuntimeError;

/// Why a search stopped without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every candidate of the strategy was examined.
    Exhausted,
    /// The candidate budget was used up before the strategy ran out.
    CandidateBudget,
    /// The wall-clock budget expired.
    TimeBudget,
    /// The cancel flag was raised.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Exhausted => "candidates exhausted",
            StopReason::CandidateBudget => "candidate budget reached",
            StopReason::TimeBudget => "time budget expired",
            StopReason::Cancelled => "cancelled",
        })
    }
}

/// Errors produced by the search driver.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search needs exactly one Input instruction, program has {found}")]
    InputCount { found: usize },

    #[error("search needs at least one Result instruction")]
    NoResultSink,

    #[error("invalid candidate strategy: {reason}")]
    InvalidStrategy { reason: String },

    #[error("invalid search config: {reason}")]
    InvalidConfig { reason: String },

    /// Expected outcome when no candidate matches.
    #[error("no candidate matched ({reason}) after examining {examined}")]
    NotFound { examined: u64, reason: StopReason },

    #[error("candidate {position}: {source}")]
    Runtime {
        position: u64,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
