//! Protocol-level errors

use thiserror::Error;

/// Failure to decode or encode a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not a `{kind, payload}` object
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// Envelope names a kind the engine does not handle
    #[error("Invalid request type: {0}")]
    UnknownKind(String),

    /// Kind is known but its payload does not match
    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// Outbound message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Whether the frame was unreadable as a whole.
    ///
    /// Fatal errors end the connection; the others are answered in-band.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Envelope(_))
    }
}
