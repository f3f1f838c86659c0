//! Session-related domain types
//!
//! Types describing who sits where in a two-party session and which phase the
//! session is in.

use serde::{Deserialize, Serialize};

/// One of the two seats in a session.
///
/// Side A always moves first (white in chess).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "side-A")]
    A,
    #[serde(rename = "side-B")]
    B,
}

impl Side {
    /// Seat index (A = 0, B = 1).
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    /// Side for a seat index, if it is one of the two seats.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Side::A),
            1 => Some(Side::B),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "side-A"),
            Side::B => write!(f, "side-B"),
        }
    }
}

/// Role of a participant within the session it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Connected but not attached to any session yet
    #[default]
    Unassigned,
    /// Holds one of the two seats
    Seat(Side),
    /// Read-only broadcast visibility, no action rights
    Observer,
}

impl Role {
    /// The seat this role holds, if any.
    pub fn seat(&self) -> Option<Side> {
        match self {
            Role::Seat(side) => Some(*side),
            _ => None,
        }
    }

    pub fn is_seat(&self) -> bool {
        matches!(self, Role::Seat(_))
    }

    pub fn is_observer(&self) -> bool {
        matches!(self, Role::Observer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Unassigned => write!(f, "unassigned"),
            Role::Seat(side) => write!(f, "{side}"),
            Role::Observer => write!(f, "observer"),
        }
    }
}

/// Lifecycle phase of a session.
///
/// `Forming` -> `Active` -> `Ended`; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Zero or one seat filled
    #[default]
    Forming,
    /// Both seats filled, accepting actions
    Active,
    /// Terminal; further input is refused
    Ended,
}

impl SessionPhase {
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionPhase::Ended)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Forming => write!(f, "forming"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Ended => write!(f, "ended"),
        }
    }
}
