//! Duplicate-connection guard for WebSocket clients.
//!
//! One live connection per (target session, remote address). The check runs
//! before the upgrade so a duplicate can be refused with a plain HTTP status;
//! the registration after the upgrade is atomic and re-checks liveness.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use duelhall_domain::{ParticipantId, SessionId};

use crate::infrastructure::session::Participant;

/// Dedup key: `{session id}-{remote address}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    session: Option<SessionId>,
    remote: SocketAddr,
}

impl ConnectionKey {
    pub fn new(session: Option<SessionId>, remote: SocketAddr) -> Self {
        Self { session, remote }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.session {
            Some(id) => write!(f, "{}-{}", id, self.remote),
            None => write!(f, "-{}", self.remote),
        }
    }
}

/// Process-wide table of live connections.
///
/// A holder counts as live while it is open and has been heard from within
/// `stale_after`. A half-open connection stops counting once that window
/// passes, before its own pump gets around to closing it.
pub struct ConnectionTable {
    entries: DashMap<ConnectionKey, Participant>,
    stale_after: Duration,
}

impl ConnectionTable {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            stale_after,
        }
    }

    /// Whether a live participant already holds `key`.
    pub fn is_live(&self, key: &ConnectionKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|participant| self.holder_is_live(&participant))
    }

    fn holder_is_live(&self, participant: &Participant) -> bool {
        !participant.is_closed() && participant.liveness().idle() < self.stale_after
    }

    /// Claim `key` for `participant`. A closed or silent holder is replaced
    /// and told to shut down.
    ///
    /// Returns `false` when another live participant won the race.
    pub fn try_register(&self, key: ConnectionKey, participant: Participant) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if self.holder_is_live(entry.get()) {
                    return false;
                }
                let stale = entry.insert(participant);
                if !stale.is_closed() {
                    tracing::info!(
                        participant_id = %stale.id(),
                        idle_ms = stale.liveness().idle().as_millis() as u64,
                        "Replacing silent connection"
                    );
                    stale.close();
                }
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(participant);
                true
            }
        }
    }

    /// Release `key` if it is still held by `participant`.
    pub fn unregister(&self, key: &ConnectionKey, participant: ParticipantId) {
        if self
            .entries
            .remove_if(key, |_, held| held.id() == participant)
            .is_some()
        {
            tracing::debug!(key = %key, participant_id = %participant, "Connection unregistered");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
