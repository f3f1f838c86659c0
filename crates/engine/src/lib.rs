//! Duelhall Engine library.
//!
//! Server side of Duelhall: matches remote clients into two-seat sessions,
//! serializes their actions through one actor per session and fans the
//! results out to both seats and any observers.
//!
//! ## Structure
//!
//! - `infrastructure/` - settings, testability ports and the session actors
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;

pub use app::App;
