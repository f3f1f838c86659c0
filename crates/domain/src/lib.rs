//! Duelhall Domain - vocabulary types and the rules-engine contract.
//!
//! Everything here is pure: no I/O, no async, no randomness. The engine crate
//! owns the actors; this crate owns the words they speak.

pub mod error;
pub mod ids;
pub mod rules;
pub mod types;

pub use error::RulesError;
pub use ids::{ParticipantId, SessionId};
pub use rules::{ChessRules, Position, RulesEngine};
pub use types::{Action, Outcome, Role, SessionPhase, Side};
