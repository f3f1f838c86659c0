//! Per-session actor
//!
//! Each session runs as one task that exclusively owns the seats, the
//! observer list and the rules-engine position. Everything else talks to it
//! through a [`SessionHandle`], so every mutation is serialized by the
//! command queue and no lock is ever needed.
//!
//! ```text
//! Forming --(second seat)--> Active --(terminal outcome | end | terminate)--> Ended
//!    \______________________(end | terminate)_____________________________/
//! ```

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use duelhall_domain::{Action, ParticipantId, Position, SessionId, SessionPhase, Side};
use duelhall_shared::{ActionResultData, InitData, ServerMessage};

use super::{Participant, SessionError};

/// Shareable link that opens a session in watch mode.
pub fn observer_url(id: &SessionId) -> String {
    format!("/play/{id}?spectator=true")
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: SessionId,
    pub phase: SessionPhase,
    pub seats_filled: usize,
    pub observers: usize,
    pub created_at: DateTime<Utc>,
    pub turn: Side,
    pub notation: String,
}

pub(crate) enum SessionCommand {
    AttachSeat {
        participant: Participant,
        reply: oneshot::Sender<Result<Side, SessionError>>,
    },
    AttachObserver {
        participant: Participant,
        reply: oneshot::Sender<()>,
    },
    SubmitAction {
        action: Action,
        from: ParticipantId,
    },
    Resync {
        from: ParticipantId,
    },
    DetachObserver {
        participant: ParticipantId,
    },
    End {
        from: ParticipantId,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Routing handle to a running session.
///
/// Every request fails with [`SessionError::Ended`] once the session loop
/// has exited.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    terminate: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Seat `participant` in the first empty seat.
    pub async fn attach_seat(&self, participant: Participant) -> Result<Side, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::AttachSeat { participant, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Ended)?
    }

    pub async fn attach_observer(&self, participant: Participant) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::AttachObserver { participant, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Ended)
    }

    /// Queue an action. Rejections are delivered to the submitter's mailbox.
    pub async fn submit_action(
        &self,
        action: Action,
        from: ParticipantId,
    ) -> Result<(), SessionError> {
        self.request(SessionCommand::SubmitAction { action, from })
            .await
    }

    /// Re-send the caller's `init` snapshot.
    pub async fn resync(&self, from: ParticipantId) -> Result<(), SessionError> {
        self.request(SessionCommand::Resync { from }).await
    }

    pub async fn detach_observer(&self, participant: ParticipantId) -> Result<(), SessionError> {
        self.request(SessionCommand::DetachObserver { participant })
            .await
    }

    /// Request an orderly end. Resolves once the `ended` notices are queued.
    pub async fn end(&self, from: ParticipantId) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::End { from, reply }).await?;
        rx.await.map_err(|_| SessionError::Ended)
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::Status { reply }).await?;
        rx.await.map_err(|_| SessionError::Ended)
    }

    /// End the session from outside. Never blocks; safe to call repeatedly.
    pub fn terminate(&self) {
        self.terminate.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate.is_cancelled()
    }

    /// Whether both handles route to the same session task.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        self.commands.same_channel(&other.commands)
    }

    async fn request(&self, command: SessionCommand) -> Result<(), SessionError> {
        if self.is_terminated() {
            return Err(SessionError::Ended);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Ended)
    }
}

pub(crate) struct GameSession {
    id: SessionId,
    created_at: DateTime<Utc>,
    observer_url: String,
    phase: SessionPhase,
    position: Box<dyn Position>,
    seats: [Option<Participant>; 2],
    observers: Vec<Participant>,
    terminate: CancellationToken,
    ended: mpsc::UnboundedSender<SessionId>,
    closed: bool,
}

impl GameSession {
    /// Start a session task in `Forming` and return its handle.
    ///
    /// `ended` receives the id exactly once, after every transport is closed.
    pub(crate) fn spawn(
        id: SessionId,
        created_at: DateTime<Utc>,
        position: Box<dyn Position>,
        ended: mpsc::UnboundedSender<SessionId>,
        command_buffer: usize,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(command_buffer.max(1));
        let terminate = CancellationToken::new();

        let session = GameSession {
            observer_url: observer_url(&id),
            id: id.clone(),
            created_at,
            phase: SessionPhase::Forming,
            position,
            seats: [None, None],
            observers: Vec::new(),
            terminate: terminate.clone(),
            ended,
            closed: false,
        };
        tokio::spawn(session.run(rx));

        SessionHandle {
            id,
            commands: tx,
            terminate,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        tracing::debug!(session_id = %self.id, "Session started");
        let terminate = self.terminate.clone();

        while !self.phase.is_ended() {
            tokio::select! {
                biased;
                _ = terminate.cancelled() => {
                    tracing::info!(session_id = %self.id, "Session terminated");
                    self.phase = SessionPhase::Ended;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => self.phase = SessionPhase::Ended,
                },
            }
        }

        // Queued requests see a closed channel from here on.
        drop(commands);
        self.teardown();
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::AttachSeat { participant, reply } => {
                let result = self.attach_seat(participant).await;
                let _ = reply.send(result);
            }
            SessionCommand::AttachObserver { participant, reply } => {
                self.attach_observer(participant).await;
                let _ = reply.send(());
            }
            SessionCommand::SubmitAction { action, from } => {
                self.submit_action(action, from).await;
            }
            SessionCommand::Resync { from } => self.resync(from).await,
            SessionCommand::DetachObserver { participant } => {
                self.take_observer(participant);
            }
            SessionCommand::End { from, reply } => {
                self.end(from).await;
                let _ = reply.send(());
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn attach_seat(&mut self, participant: Participant) -> Result<Side, SessionError> {
        if self.phase != SessionPhase::Forming {
            return Err(SessionError::Full);
        }
        if self.seat_of(participant.id()).is_some() {
            return Err(SessionError::AlreadyAttached);
        }
        let side = self
            .seats
            .iter()
            .position(Option::is_none)
            .and_then(Side::from_index)
            .ok_or(SessionError::Full)?;

        self.seats[side.index()] = Some(participant.clone());
        tracing::info!(
            session_id = %self.id,
            participant_id = %participant.id(),
            side = %side,
            "Seat filled"
        );

        if self.seats.iter().all(Option::is_some) {
            self.phase = SessionPhase::Active;
            tracing::info!(session_id = %self.id, "Session active");
            for side in [Side::A, Side::B] {
                if let Some(seat) = self.seat(side) {
                    self.deliver(seat, self.init_for(Some(side))).await;
                }
            }
        } else {
            self.deliver(&participant, self.init_for(Some(side))).await;
        }

        Ok(side)
    }

    async fn attach_observer(&mut self, participant: Participant) {
        tracing::info!(
            session_id = %self.id,
            participant_id = %participant.id(),
            "Observer attached"
        );
        self.deliver(&participant, self.init_for(None)).await;
        self.observers.push(participant);
    }

    async fn submit_action(&mut self, action: Action, from: ParticipantId) {
        let Some(side) = self.seat_of(from) else {
            match self.observer(from) {
                Some(observer) => {
                    self.deliver(observer, ServerMessage::error(SessionError::ObserverAction.to_string()))
                        .await;
                }
                None => tracing::warn!(
                    session_id = %self.id,
                    participant_id = %from,
                    "Action from participant not in session"
                ),
            }
            return;
        };

        if let Err(error) = self.check_turn(side) {
            self.reject(side, error).await;
            return;
        }

        let next = match self.position.apply_action(&action) {
            Ok(next) => next,
            Err(error) => {
                tracing::debug!(
                    session_id = %self.id,
                    action = %action,
                    error = %error,
                    "Action rejected by rules engine"
                );
                self.reject(side, SessionError::IllegalAction).await;
                return;
            }
        };

        self.position = next;
        let outcome = self.position.classify_outcome();
        tracing::debug!(
            session_id = %self.id,
            side = %side,
            action = %action,
            outcome = %outcome,
            "Action applied"
        );

        self.broadcast(ServerMessage::ActionResult(ActionResultData { action, outcome }))
            .await;

        if outcome.is_terminal() {
            tracing::info!(session_id = %self.id, outcome = %outcome, "Session decided");
            self.phase = SessionPhase::Ended;
        }
    }

    fn check_turn(&self, side: Side) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Active {
            return Err(SessionError::NotActive);
        }
        if self.position.turn() != side {
            return Err(SessionError::NotYourTurn);
        }
        Ok(())
    }

    async fn reject(&self, side: Side, error: SessionError) {
        if let Some(seat) = self.seat(side) {
            self.deliver(seat, ServerMessage::error(error.to_string()))
                .await;
        }
    }

    async fn resync(&mut self, from: ParticipantId) {
        if let Some(side) = self.seat_of(from) {
            if let Some(seat) = self.seat(side) {
                self.deliver(seat, self.init_for(Some(side))).await;
            }
        } else if let Some(observer) = self.observer(from) {
            self.deliver(observer, self.init_for(None)).await;
        }
    }

    async fn end(&mut self, from: ParticipantId) {
        let notice = ServerMessage::ended(SessionError::Ended.to_string());

        if let Some(side) = self.seat_of(from) {
            tracing::info!(session_id = %self.id, side = %side, "End requested");
            join_all(self.roster().map(|p| self.deliver(p, notice.clone()))).await;
            self.phase = SessionPhase::Ended;
        } else if let Some(observer) = self.take_observer(from) {
            self.deliver(&observer, notice).await;
        }
    }

    /// Seat A, seat B, then observers in attach order.
    async fn broadcast(&mut self, message: ServerMessage) {
        for side in [Side::A, Side::B] {
            if let Some(seat) = self.seat(side) {
                self.deliver(seat, message.clone()).await;
            }
        }

        let mut gone = Vec::new();
        for observer in &self.observers {
            if !self.deliver(observer, message.clone()).await {
                gone.push(observer.id());
            }
        }
        if !gone.is_empty() {
            self.observers.retain(|o| !gone.contains(&o.id()));
            tracing::debug!(session_id = %self.id, dropped = gone.len(), "Dropped closed observers");
        }
    }

    /// Hand `message` to one participant.
    ///
    /// Gives up when the participant closes or the session is terminated.
    async fn deliver(&self, participant: &Participant, message: ServerMessage) -> bool {
        let delivered = tokio::select! {
            biased;
            _ = self.terminate.cancelled() => false,
            sent = participant.send(message) => sent.is_ok(),
        };
        if !delivered {
            tracing::debug!(
                session_id = %self.id,
                participant_id = %participant.id(),
                "Message not delivered"
            );
        }
        delivered
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.terminate.cancel();

        for participant in self.roster() {
            participant.close();
        }
        if self.ended.send(self.id.clone()).is_err() {
            tracing::debug!(session_id = %self.id, "Registry gone before session end");
        }
        tracing::info!(session_id = %self.id, "Session ended");
    }

    fn init_for(&self, role: Option<Side>) -> ServerMessage {
        ServerMessage::Init(InitData {
            time: self.created_at,
            role,
            turn: self.position.turn(),
            session_id: self.id.to_string(),
            observer_url: self.observer_url.clone(),
            observer: role.is_none(),
        })
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id.clone(),
            phase: self.phase,
            seats_filled: self.seats.iter().flatten().count(),
            observers: self.observers.len(),
            created_at: self.created_at,
            turn: self.position.turn(),
            notation: self.position.notation(),
        }
    }

    fn seat(&self, side: Side) -> Option<&Participant> {
        self.seats[side.index()].as_ref()
    }

    fn seat_of(&self, id: ParticipantId) -> Option<Side> {
        self.seats
            .iter()
            .position(|seat| seat.as_ref().is_some_and(|p| p.id() == id))
            .and_then(Side::from_index)
    }

    fn observer(&self, id: ParticipantId) -> Option<&Participant> {
        self.observers.iter().find(|o| o.id() == id)
    }

    fn take_observer(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.observers.iter().position(|o| o.id() == id)?;
        tracing::debug!(session_id = %self.id, participant_id = %id, "Observer detached");
        Some(self.observers.remove(index))
    }

    fn roster(&self) -> impl Iterator<Item = &Participant> {
        self.seats.iter().flatten().chain(self.observers.iter())
    }
}
