//! Duelhall Protocol - types shared between the engine and its clients
//!
//! - WebSocket message types (`ClientMessage`, `ServerMessage`)
//! - The `{kind, payload}` envelope and its decoding rules
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, chrono and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Closed message set** - one tagged enum per direction, no ad hoc shapes

pub mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{
    kinds, ActionResultData, ClientMessage, EndedData, Envelope, ErrorData, InitData, JoinData,
    ServerMessage,
};
