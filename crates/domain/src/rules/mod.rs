//! Rules-engine contract.
//!
//! The session engine never inspects rule internals. It only asks a position
//! whose turn it is, asks it to apply an action (getting back a *new*
//! position, so a rejected action can never leave a half-applied state), and
//! asks it to classify the outcome.

mod chess;

pub use chess::ChessRules;

use std::fmt;

use crate::error::RulesError;
use crate::types::{Action, Outcome, Side};

/// A rules-engine position.
///
/// Positions are immutable values; `apply_action` produces the successor.
pub trait Position: Send + Sync + fmt::Debug {
    /// Side whose turn it is to act.
    fn turn(&self) -> Side;

    /// Validate `action` against this position and return the resulting one.
    fn apply_action(&self, action: &Action) -> Result<Box<dyn Position>, RulesError>;

    /// Terminal-outcome classification of this position.
    fn classify_outcome(&self) -> Outcome;

    /// Canonical text form of the position (FEN for chess).
    ///
    /// Two positions with equal notation are the same position.
    fn notation(&self) -> String;
}

/// Factory for starting positions.
pub trait RulesEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fresh starting position for a new session.
    fn new_position(&self) -> Box<dyn Position>;
}
