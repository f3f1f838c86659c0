//! # Duelhall Domain Types
//!
//! Shared vocabulary types used by both the engine and the wire protocol.
//!
//! ## Design Principles
//!
//! 1. **Pure data types** - No I/O, no async, no side effects
//! 2. **Stable API** - Changes here affect both engine and protocol
//! 3. **Serializable** - All types derive Serialize/Deserialize

// Session types
mod session;
pub use session::{Role, SessionPhase, Side};

// Outcome classification
mod outcome;
pub use outcome::Outcome;

// Proposed actions
mod action;
pub use action::Action;
