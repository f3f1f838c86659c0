//! A proposed action submitted by a seat.

use serde::{Deserialize, Serialize};

/// One move, expressed as origin and destination squares.
///
/// The rules engine decides what the squares mean; the session only routes
/// the action and embeds it verbatim in the broadcast result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub from: String,
    pub to: String,
    /// Promotion piece letter (`q`, `r`, `b`, `n`) when a pawn reaches the last rank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl Action {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = &self.promotion {
            write!(f, "{piece}")?;
        }
        Ok(())
    }
}
