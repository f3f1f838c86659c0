//! Session registry and matchmaker
//!
//! A single actor owns the id -> session map and the pending-match slot.
//! Connections never touch either directly; they send a command and await
//! the reply, which makes the registry loop the only arbiter when intakes,
//! joins and departures race each other.
//!
//! Sessions report their own end on an unbounded channel. The loop drains
//! that channel before taking the next command, so a finished id is never
//! handed out again.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use duelhall_domain::{ParticipantId, Role, RulesEngine, SessionId};

use super::game_session::GameSession;
use super::{Participant, SessionError, SessionHandle};
use crate::infrastructure::ports::{ClockPort, RandomPort};

/// Buffer size for the registry command channel.
const REGISTRY_COMMAND_BUFFER: usize = 64;

/// Where a connection ended up after intake or join.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub session: SessionHandle,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Live sessions, forming or active
    pub sessions: usize,
    /// Whether a participant is waiting for an opponent
    pub pending: bool,
}

/// Dependencies of the registry loop.
pub struct RegistryConfig {
    pub rules: Arc<dyn RulesEngine>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    pub session_command_buffer: usize,
}

enum RegistryCommand {
    Intake {
        participant: Participant,
        reply: oneshot::Sender<Result<Attachment, SessionError>>,
    },
    Join {
        session_id: SessionId,
        participant: Participant,
        seat: bool,
        observer: bool,
        reply: oneshot::Sender<Result<Attachment, SessionError>>,
    },
    Departed {
        participant: ParticipantId,
        attachment: Option<Attachment>,
    },
    Lookup {
        session_id: SessionId,
        reply: oneshot::Sender<Option<SessionHandle>>,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
}

/// Handle to the registry loop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    commands: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Start the registry loop.
    pub fn spawn(config: RegistryConfig) -> Self {
        let (tx, rx) = mpsc::channel(REGISTRY_COMMAND_BUFFER);
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();

        let registry = Registry {
            config,
            sessions: HashMap::new(),
            pending: None,
            ended_tx,
        };
        tokio::spawn(registry.run(rx, ended_rx));

        Self { commands: tx }
    }

    /// Match a participant with whoever is waiting, or make it wait.
    pub async fn intake(&self, participant: Participant) -> Result<Attachment, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Intake { participant, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Ended)?
    }

    /// Attach to a known session.
    ///
    /// `seat` insists on a seat and overrides `observer`.
    pub async fn join(
        &self,
        session_id: SessionId,
        participant: Participant,
        seat: bool,
        observer: bool,
    ) -> Result<Attachment, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Join {
            session_id,
            participant,
            seat,
            observer,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Ended)?
    }

    /// Report a closed connection.
    pub async fn departed(&self, participant: ParticipantId, attachment: Option<Attachment>) {
        if self
            .send(RegistryCommand::Departed {
                participant,
                attachment,
            })
            .await
            .is_err()
        {
            tracing::warn!(participant_id = %participant, "Registry gone, departure dropped");
        }
    }

    pub async fn lookup(&self, session_id: SessionId) -> Option<SessionHandle> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Lookup { session_id, reply })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn stats(&self) -> RegistryStats {
        let (reply, rx) = oneshot::channel();
        if self.send(RegistryCommand::Stats { reply }).await.is_err() {
            return RegistryStats::default();
        }
        rx.await.unwrap_or_default()
    }

    async fn send(&self, command: RegistryCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Ended)
    }
}

struct Pending {
    participant: ParticipantId,
    session: SessionHandle,
}

struct Registry {
    config: RegistryConfig,
    sessions: HashMap<SessionId, SessionHandle>,
    pending: Option<Pending>,
    ended_tx: mpsc::UnboundedSender<SessionId>,
}

impl Registry {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RegistryCommand>,
        mut ended: mpsc::UnboundedReceiver<SessionId>,
    ) {
        tracing::debug!(rules = self.config.rules.name(), "Registry started");
        loop {
            tokio::select! {
                biased;
                Some(id) = ended.recv() => self.forget(&id),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Registry stopped");
    }

    async fn handle(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Intake { participant, reply } => {
                let result = self.intake(participant).await;
                let _ = reply.send(result);
            }
            RegistryCommand::Join {
                session_id,
                participant,
                seat,
                observer,
                reply,
            } => {
                let result = self.join(session_id, participant, seat, observer).await;
                let _ = reply.send(result);
            }
            RegistryCommand::Departed {
                participant,
                attachment,
            } => self.departed(participant, attachment),
            RegistryCommand::Lookup { session_id, reply } => {
                let _ = reply.send(self.live(&session_id));
            }
            RegistryCommand::Stats { reply } => {
                let _ = reply.send(RegistryStats {
                    sessions: self.sessions.len(),
                    pending: self.pending.is_some(),
                });
            }
        }
    }

    async fn intake(&mut self, participant: Participant) -> Result<Attachment, SessionError> {
        if let Some(pending) = self.pending.take() {
            if pending.participant == participant.id() {
                self.pending = Some(pending);
                return Err(SessionError::AlreadyAttached);
            }

            match pending.session.attach_seat(participant.clone()).await {
                Ok(side) => {
                    tracing::info!(
                        session_id = %pending.session.id(),
                        participant_id = %participant.id(),
                        "Matched with pending participant"
                    );
                    return Ok(Attachment {
                        session: pending.session,
                        role: Role::Seat(side),
                    });
                }
                Err(error) => {
                    tracing::debug!(
                        session_id = %pending.session.id(),
                        error = %error,
                        "Discarding stale pending slot"
                    );
                }
            }
        }

        let session = self.create_session();
        match session.attach_seat(participant.clone()).await {
            Ok(side) => {
                self.pending = Some(Pending {
                    participant: participant.id(),
                    session: session.clone(),
                });
                Ok(Attachment {
                    session,
                    role: Role::Seat(side),
                })
            }
            Err(error) => {
                session.terminate();
                self.remove(&session);
                Err(error)
            }
        }
    }

    async fn join(
        &mut self,
        session_id: SessionId,
        participant: Participant,
        seat: bool,
        observer: bool,
    ) -> Result<Attachment, SessionError> {
        let session = self.live(&session_id).ok_or(SessionError::NotFound)?;

        if seat || !observer {
            match session.attach_seat(participant.clone()).await {
                Ok(side) => {
                    if self
                        .pending
                        .as_ref()
                        .is_some_and(|p| p.session.same_session(&session))
                    {
                        self.pending = None;
                    }
                    return Ok(Attachment {
                        session,
                        role: Role::Seat(side),
                    });
                }
                Err(SessionError::Full) if !seat => {}
                Err(SessionError::Ended) => return Err(SessionError::NotFound),
                Err(error) => return Err(error),
            }
        }

        session
            .attach_observer(participant)
            .await
            .map_err(|_| SessionError::NotFound)?;
        Ok(Attachment {
            session,
            role: Role::Observer,
        })
    }

    fn departed(&mut self, participant: ParticipantId, attachment: Option<Attachment>) {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.participant == participant)
        {
            tracing::debug!(participant_id = %participant, "Pending participant left");
            self.pending = None;
        }

        let Some(attachment) = attachment else {
            return;
        };
        if attachment.role.is_seat() {
            tracing::info!(
                session_id = %attachment.session.id(),
                participant_id = %participant,
                "Seat departed, terminating session"
            );
            attachment.session.terminate();
            self.remove(&attachment.session);
        }
    }

    fn forget(&mut self, id: &SessionId) {
        if self
            .sessions
            .get(id)
            .is_some_and(SessionHandle::is_terminated)
        {
            self.sessions.remove(id);
            tracing::debug!(session_id = %id, "Ended session removed");
        }
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.session.id() == id && p.session.is_terminated())
        {
            self.pending = None;
        }
    }

    fn remove(&mut self, session: &SessionHandle) {
        if self
            .sessions
            .get(session.id())
            .is_some_and(|s| s.same_session(session))
        {
            self.sessions.remove(session.id());
        }
    }

    fn live(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions
            .get(id)
            .filter(|s| !s.is_terminated())
            .cloned()
    }

    fn create_session(&mut self) -> SessionHandle {
        let id = self.mint_id();
        let session = GameSession::spawn(
            id.clone(),
            self.config.clock.now(),
            self.config.rules.new_position(),
            self.ended_tx.clone(),
            self.config.session_command_buffer,
        );
        tracing::info!(session_id = %id, "Session created");
        self.sessions.insert(id, session.clone());
        session
    }

    fn mint_id(&self) -> SessionId {
        loop {
            let id = SessionId::generate_with(|n| self.config.random.gen_index(n));
            if !self.sessions.contains_key(&id) {
                return id;
            }
            tracing::debug!(session_id = %id, "Session id collision, minting again");
        }
    }
}
