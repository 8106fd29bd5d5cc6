//! Error taxonomy for the game core
//!
//! Nothing here is fatal. Per-step callers log the error and skip the
//! offending request so the frame loop never stalls.

use thiserror::Error;

use crate::sim::pool::PoolKey;
use crate::sim::rank::RankId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Archetype lookup failed (malformed spawn/merge request)
    #[error("unknown rank {0:?}")]
    UnknownRank(RankId),
    /// Rank table violates the chain invariants
    #[error("invalid rank chain: {0}")]
    InvalidChain(String),
    /// Pool key does not refer to a live instance
    #[error("pool key {0:?} is not live")]
    NotLive(PoolKey),
    /// A terminal-rank object was asked to merge
    #[error("rank {0:?} is terminal and cannot merge")]
    TerminalRank(RankId),
    /// An object was committed to a second merge
    #[error("fruit {0:?} already committed to a merge")]
    AlreadyLocked(PoolKey),
    /// Tuning could not be parsed
    #[error("config error: {0}")]
    Config(String),
    /// Persistence backend failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}
