//! Inbound pump: socket frames -> registry and session commands.

use std::fmt::Display;

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};

use duelhall_domain::{Action, SessionId};
use duelhall_shared::{kinds, ClientMessage, JoinData, ProtocolError, ServerMessage};

use super::ConnectParams;
use crate::infrastructure::session::{Attachment, Participant, RegistryHandle, SessionError};

/// Whether the read loop keeps going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Per-connection dispatch state.
pub struct Connection {
    participant: Participant,
    registry: RegistryHandle,
    attachment: Option<Attachment>,
}

impl Connection {
    pub fn new(participant: Participant, registry: RegistryHandle) -> Self {
        Self {
            participant,
            registry,
            attachment: None,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Act on the connection's query parameters before reading frames.
    pub async fn open(&mut self, params: &ConnectParams) {
        match params.target() {
            Some(session_id) => {
                self.join(session_id, params.wants_seat(), params.wants_observer())
                    .await;
            }
            None if params.wants_observer() => {
                self.reply_error(SessionError::ObserverRequiresSession)
                    .await;
            }
            None => {}
        }
    }

    /// Read frames until the peer goes away, then clean up.
    pub async fn run<S, E>(mut self, mut stream: S)
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let id = self.participant.id();

        loop {
            let frame = tokio::select! {
                _ = self.participant.closed() => {
                    tracing::debug!(participant_id = %id, "Transport closed");
                    break;
                }
                frame = stream.next() => frame,
            };

            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::debug!(participant_id = %id, error = %e, "WebSocket read error");
                    break;
                }
                None => break,
            };
            self.participant.liveness().touch();

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => {
                    tracing::info!(participant_id = %id, "WebSocket closed by client");
                    break;
                }
                Message::Binary(_) => {
                    tracing::debug!(participant_id = %id, "Ignoring binary frame");
                    continue;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            let message = match ClientMessage::decode(text.as_str()) {
                Ok(message) => message,
                Err(e) if e.is_fatal() => {
                    tracing::warn!(participant_id = %id, error = %e, "Unreadable frame, closing");
                    break;
                }
                Err(e) => {
                    tracing::debug!(participant_id = %id, error = %e, "Rejected message");
                    self.reply_error(rejection_message(&e)).await;
                    continue;
                }
            };

            if self.dispatch(message).await == Flow::Stop {
                break;
            }
        }

        self.depart().await;
    }

    pub(crate) async fn dispatch(&mut self, message: ClientMessage) -> Flow {
        match message {
            ClientMessage::Init => self.init().await,
            ClientMessage::Join(JoinData {
                session_id,
                observer,
                seat,
            }) => {
                self.join(SessionId::from(session_id), seat, observer && !seat)
                    .await;
            }
            ClientMessage::SubmitAction(action) => self.submit_action(action).await,
            ClientMessage::End => return self.end().await,
            ClientMessage::Error(report) => {
                tracing::warn!(
                    participant_id = %self.participant.id(),
                    message = %report.message,
                    "Client reported error"
                );
            }
        }
        Flow::Continue
    }

    async fn init(&mut self) {
        if let Some(attachment) = &self.attachment {
            if let Err(e) = attachment.session.resync(self.participant.id()).await {
                self.reply_error(e).await;
            }
            return;
        }

        match self.registry.intake(self.participant.clone()).await {
            Ok(attachment) => self.attach(attachment),
            Err(e) => self.reply_error(e).await,
        }
    }

    async fn join(&mut self, session_id: SessionId, seat: bool, observer: bool) {
        if self.attachment.is_some() {
            self.reply_error(SessionError::AlreadyAttached).await;
            return;
        }

        match self
            .registry
            .join(session_id, self.participant.clone(), seat, observer)
            .await
        {
            Ok(attachment) => self.attach(attachment),
            Err(e) => self.reply_error(e).await,
        }
    }

    async fn submit_action(&mut self, action: Action) {
        let result = match &self.attachment {
            None => Err(SessionError::NotActive),
            Some(attachment) if attachment.role.is_observer() => Err(SessionError::ObserverAction),
            Some(attachment) => {
                attachment
                    .session
                    .submit_action(action, self.participant.id())
                    .await
            }
        };
        if let Err(e) = result {
            self.reply_error(e).await;
        }
    }

    async fn end(&mut self) -> Flow {
        let Some(attachment) = &self.attachment else {
            self.reply_error(SessionError::NoActiveSession).await;
            return Flow::Continue;
        };

        if let Err(e) = attachment.session.end(self.participant.id()).await {
            tracing::debug!(participant_id = %self.participant.id(), error = %e, "End on finished session");
        }
        Flow::Stop
    }

    fn attach(&mut self, attachment: Attachment) {
        tracing::info!(
            participant_id = %self.participant.id(),
            remote = ?self.participant.remote(),
            session_id = %attachment.session.id(),
            role = ?attachment.role,
            "Participant attached"
        );
        self.attachment = Some(attachment);
    }

    async fn reply_error(&self, error: impl Display) {
        let _ = self
            .participant
            .send(ServerMessage::error(error.to_string()))
            .await;
    }

    /// Detach, tell the registry, close the transport.
    async fn depart(mut self) {
        let id = self.participant.id();
        let attachment = self.attachment.take();

        if let Some(attachment) = &attachment {
            if attachment.role.is_observer() {
                let _ = attachment.session.detach_observer(id).await;
            }
        }
        self.registry.departed(id, attachment).await;
        self.participant.close();
        tracing::debug!(
            participant_id = %id,
            remote = ?self.participant.remote(),
            "Participant departed"
        );
    }
}

/// Client-facing text for a request the engine could not read.
fn rejection_message(error: &ProtocolError) -> &'static str {
    match error {
        ProtocolError::InvalidPayload { kind, .. } if kind == kinds::SUBMIT_ACTION => {
            "Invalid move format"
        }
        ProtocolError::InvalidPayload { kind, .. } if kind == kinds::JOIN => {
            "Invalid join game message format"
        }
        _ => "Invalid request type",
    }
}
