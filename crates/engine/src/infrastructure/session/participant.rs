//! Connection-side handle shared between the pumps and the session actors.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use duelhall_domain::ParticipantId;
use duelhall_shared::ServerMessage;

use super::SessionError;

/// Timestamp of the last inbound frame on a connection.
///
/// Written by the inbound pump, read by the outbound pump.
#[derive(Debug, Clone)]
pub struct Liveness {
    origin: Instant,
    last_seen_ms: Arc<AtomicU64>,
}

impl Liveness {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_seen_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an inbound frame.
    pub fn touch(&self) {
        let ms = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_seen_ms.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed))
    }

    /// Time since the last inbound frame.
    pub fn idle(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_seen())
    }
}

/// One live connection.
///
/// Cloning is cheap; every clone routes to the same mailbox and shares the
/// same close signal. Sessions hold clones, never the transport itself.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    remote: Option<SocketAddr>,
    mailbox: mpsc::Sender<ServerMessage>,
    close: CancellationToken,
    liveness: Liveness,
}

impl Participant {
    /// Create a participant and the receiving end of its mailbox.
    pub fn connect(
        remote: Option<SocketAddr>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let participant = Self {
            id: ParticipantId::new(),
            remote,
            mailbox: tx,
            close: CancellationToken::new(),
            liveness: Liveness::new(),
        };
        (participant, rx)
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Hand a message to the outbound pump.
    ///
    /// Waits while the mailbox is full. Fails once the transport is closed.
    pub async fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        if self.close.is_cancelled() {
            return Err(SessionError::MailboxClosed);
        }
        tokio::select! {
            biased;
            _ = self.close.cancelled() => Err(SessionError::MailboxClosed),
            sent = self.mailbox.send(message) => sent.map_err(|_| SessionError::MailboxClosed),
        }
    }

    /// Signal both pumps to shut the transport down. Idempotent.
    pub fn close(&self) {
        self.close.cancel();
    }

    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.close.cancelled()
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }
}
