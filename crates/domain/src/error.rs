//! Error types for the rules-engine contract

use thiserror::Error;

/// Why a rules engine refused a proposed action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The action could not be parsed into the engine's move notation
    #[error("Malformed action: {0}")]
    Malformed(String),

    /// The action is well-formed but not legal in the current position
    #[error("Illegal action: {0}")]
    Illegal(String),

    /// The position is already terminal; no further actions are accepted
    #[error("Position is already decided")]
    AlreadyDecided,
}

impl RulesError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn illegal(msg: impl Into<String>) -> Self {
        Self::Illegal(msg.into())
    }
}
