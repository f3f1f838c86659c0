//! WebSocket handling for session clients.
//!
//! Each connection gets a [`Participant`] and two pumps:
//! - inbound (this task): reads frames and dispatches them to the registry or
//!   the owning session
//! - outbound (spawned): drains the participant's mailbox onto the socket and
//!   probes liveness

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

mod inbound;
mod outbound;

pub use inbound::Connection;
pub use outbound::{run_outbound, PumpSettings};

use duelhall_domain::SessionId;

use super::connections::{ConnectionKey, ConnectionTable};
use crate::app::App;
use crate::infrastructure::session::Participant;

/// Combined state for WebSocket handlers.
pub struct WsState {
    pub app: Arc<App>,
    pub connections: Arc<ConnectionTable>,
}

impl WsState {
    pub fn new(app: Arc<App>) -> Self {
        let connections = Arc::new(ConnectionTable::new(app.settings.pong_wait));
        Self { app, connections }
    }
}

/// Query parameters accepted on `/ws`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    /// Session to join right after the upgrade
    #[serde(rename = "gameId")]
    pub game_id: Option<String>,
    /// `true` to watch instead of play
    pub spectator: Option<String>,
    /// `true` to insist on a seat; wins over `spectator`
    pub play: Option<String>,
}

impl ConnectParams {
    pub fn target(&self) -> Option<SessionId> {
        self.game_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SessionId::from)
    }

    pub fn wants_seat(&self) -> bool {
        flag(&self.play)
    }

    pub fn wants_observer(&self) -> bool {
        flag(&self.spectator) && !self.wants_seat()
    }
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim) == Some("true")
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<WsState>>,
) -> Response {
    let key = ConnectionKey::new(params.target(), remote);
    if state.connections.is_live(&key) {
        tracing::warn!(key = %key, "Duplicate connection refused");
        return (StatusCode::CONFLICT, "Already connected").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, params, remote, key))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<WsState>,
    params: ConnectParams,
    remote: SocketAddr,
    key: ConnectionKey,
) {
    let settings = &state.app.settings;
    let (participant, mailbox) = Participant::connect(Some(remote), settings.mailbox_capacity);

    if !state.connections.try_register(key.clone(), participant.clone()) {
        tracing::warn!(key = %key, "Duplicate connection lost registration race");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    tracing::info!(
        participant_id = %participant.id(),
        remote = %remote,
        "WebSocket connection established"
    );

    let (sink, stream) = socket.split();
    let send_task = tokio::spawn(run_outbound(
        participant.clone(),
        mailbox,
        sink,
        PumpSettings::from(settings),
    ));

    let mut connection = Connection::new(participant.clone(), state.app.registry.clone());
    connection.open(&params).await;
    connection.run(stream).await;

    // Clean up
    state.connections.unregister(&key, participant.id());
    if let Err(e) = send_task.await {
        tracing::error!(participant_id = %participant.id(), error = %e, "Outbound pump panicked");
    }
    tracing::info!(participant_id = %participant.id(), "WebSocket connection closed");
}

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod tests {
    use super::*;

    fn params(game_id: Option<&str>, spectator: Option<&str>, play: Option<&str>) -> ConnectParams {
        ConnectParams {
            game_id: game_id.map(str::to_string),
            spectator: spectator.map(str::to_string),
            play: play.map(str::to_string),
        }
    }

    #[test]
    fn play_overrides_spectator() {
        let p = params(Some("abc123"), Some("true"), Some("true"));
        assert!(p.wants_seat());
        assert!(!p.wants_observer());
    }

    #[test]
    fn only_literal_true_counts() {
        let p = params(Some("abc123"), Some("yes"), Some("1"));
        assert!(!p.wants_seat());
        assert!(!p.wants_observer());
    }

    #[test]
    fn blank_game_id_is_no_target() {
        assert_eq!(params(Some("  "), None, None).target(), None);
        assert_eq!(
            params(Some(" abc123 "), None, None).target(),
            Some(SessionId::from("abc123"))
        );
    }
}
