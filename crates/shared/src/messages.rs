//! WebSocket message types for engine-client communication
//!
//! Every frame is a `{kind, payload}` envelope serialized as JSON text.
//! Clients send [`ClientMessage`]s; the engine answers with [`ServerMessage`]s.
//!
//! ## Decoding policy
//!
//! Decoding a client frame happens in two steps so the engine can tell a
//! broken frame from a bad request:
//!
//! 1. [`Envelope::decode`] - the frame is not a `{kind, payload}` object at all.
//!    This is a transport-level failure and ends the connection.
//! 2. [`ClientMessage::try_from`] - unknown kind or malformed payload. These
//!    are answered with an `error` message and the connection stays open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duelhall_domain::{Action, Outcome, Side};

use crate::error::ProtocolError;

/// Wire names of every message kind.
pub mod kinds {
    pub const INIT: &str = "init";
    pub const SUBMIT_ACTION: &str = "submit-action";
    pub const END: &str = "end";
    pub const JOIN: &str = "join";
    pub const ERROR: &str = "error";
    pub const ACTION_RESULT: &str = "action-result";
    pub const ENDED: &str = "ended";
}

// =============================================================================
// Envelope
// =============================================================================

/// Undecoded `{kind, payload}` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Parse the outer envelope of a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Envelope)
    }
}

// =============================================================================
// Client Messages (Client -> Engine)
// =============================================================================

/// Messages from a client to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Ask to be matched (or, when already attached, for a fresh snapshot)
    Init,
    /// Propose an action in the attached session
    SubmitAction(Action),
    /// Ask to end the attached session
    End,
    /// Join a specific session by id
    Join(JoinData),
    /// Client-side error report (logged by the engine)
    Error(ErrorData),
}

impl ClientMessage {
    /// Decode a full text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::try_from(Envelope::decode(text)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init => kinds::INIT,
            ClientMessage::SubmitAction(_) => kinds::SUBMIT_ACTION,
            ClientMessage::End => kinds::END,
            ClientMessage::Join(_) => kinds::JOIN,
            ClientMessage::Error(_) => kinds::ERROR,
        }
    }
}

impl TryFrom<Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { kind, payload } = envelope;
        let invalid = |source| ProtocolError::InvalidPayload {
            kind: kind.clone(),
            source,
        };

        match kind.as_str() {
            kinds::INIT => Ok(ClientMessage::Init),
            kinds::END => Ok(ClientMessage::End),
            kinds::SUBMIT_ACTION => serde_json::from_value(payload)
                .map(ClientMessage::SubmitAction)
                .map_err(invalid),
            kinds::JOIN => serde_json::from_value(payload)
                .map(ClientMessage::Join)
                .map_err(invalid),
            kinds::ERROR => serde_json::from_value(payload)
                .map(ClientMessage::Error)
                .map_err(invalid),
            _ => Err(ProtocolError::UnknownKind(kind)),
        }
    }
}

/// Payload of a `join` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub session_id: String,
    /// Caller wants to watch
    #[serde(default)]
    pub observer: bool,
    /// Caller insists on a seat; overrides `observer`
    #[serde(default)]
    pub seat: bool,
}

// =============================================================================
// Server Messages (Engine -> Client)
// =============================================================================

/// Messages from the engine to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Session snapshot for a newly attached (or resyncing) participant
    Init(InitData),
    /// An accepted action and the outcome it produced
    ActionResult(ActionResultData),
    /// Request rejected; only the requester receives it
    Error(ErrorData),
    /// Session termination notice
    Ended(EndedData),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorData {
            message: message.into(),
        })
    }

    pub fn ended(message: impl Into<String>) -> Self {
        ServerMessage::Ended(EndedData {
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Init(_) => kinds::INIT,
            ServerMessage::ActionResult(_) => kinds::ACTION_RESULT,
            ServerMessage::Error(_) => kinds::ERROR,
            ServerMessage::Ended(_) => kinds::ENDED,
        }
    }

    /// Encode as one text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Payload of an `init` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    /// Session start time
    pub time: DateTime<Utc>,
    /// Seat held by the recipient; `None` for observers
    pub role: Option<Side>,
    /// Side whose turn it currently is
    pub turn: Side,
    pub session_id: String,
    /// Shareable link for watching this session
    pub observer_url: String,
    pub observer: bool,
}

/// Payload of an `action-result` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResultData {
    pub action: Action,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndedData {
    pub message: String,
}
