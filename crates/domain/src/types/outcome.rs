//! Terminal-outcome classification reported by a rules engine.

use serde::{Deserialize, Serialize};

use super::Side;

/// Result of classifying a position after an accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Outcome {
    /// Play continues
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "side-A")]
    SideA,
    #[serde(rename = "side-B")]
    SideB,
    #[serde(rename = "draw")]
    Draw,
}

impl Outcome {
    /// Outcome in which `side` has won.
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::A => Outcome::SideA,
            Side::B => Outcome::SideB,
        }
    }

    /// Any outcome other than `None` ends the session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::None)
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::SideA => Some(Side::A),
            Outcome::SideB => Some(Side::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::None => write!(f, "none"),
            Outcome::SideA => write!(f, "side-A"),
            Outcome::SideB => write!(f, "side-B"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}
