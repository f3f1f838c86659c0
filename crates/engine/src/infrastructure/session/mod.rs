//! Session actors for live two-seat sessions
//!
//! - [`Participant`] - one live connection, as seen by the actors
//! - [`SessionHandle`] - routing handle to a per-session actor
//! - [`RegistryHandle`] - id lookup and matchmaking
//!
//! Actors own their state outright and communicate only through channels.
//! Handles never hold ownership of what they point at, so a participant
//! routed to a session never keeps that session alive.

mod errors;
mod game_session;
mod participant;
mod registry;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export all public types
pub use errors::SessionError;
pub use game_session::{observer_url, SessionHandle, SessionStatus};
pub use participant::{Liveness, Participant};
pub use registry::{Attachment, RegistryConfig, RegistryHandle, RegistryStats};
