use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

// Connection-scoped participant IDs
define_id!(ParticipantId);

/// Short, shareable session identifier (e.g. `k3x9qa`).
///
/// Session ids end up in observer links, so they are kept short rather than
/// being UUIDs. Uniqueness is enforced by the registry, which re-mints on
/// collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Number of characters in a freshly minted id.
    pub const LENGTH: usize = 6;

    /// Characters a minted id is drawn from.
    pub const ALPHABET: &'static [u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    /// Mint a new id. `pick(n)` must return an index in `0..n`.
    ///
    /// The RNG is injected so the domain stays free of a random source.
    pub fn generate_with(mut pick: impl FnMut(usize) -> usize) -> Self {
        let id = (0..Self::LENGTH)
            .map(|_| {
                let idx = pick(Self::ALPHABET.len()) % Self::ALPHABET.len();
                Self::ALPHABET[idx] as char
            })
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}
