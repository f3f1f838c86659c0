//! API layer - HTTP and WebSocket entry points.

pub mod connections;
pub mod http;
pub mod websocket;

pub use connections::{ConnectionKey, ConnectionTable};

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::app::App;
use websocket::WsState;

/// Build the full router with separate states for HTTP and WebSocket.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// WebSocket handler needs the remote address.
pub fn router(app: Arc<App>) -> Router {
    router_with_state(Arc::new(WsState::new(app)))
}

pub fn router_with_state(ws_state: Arc<WsState>) -> Router {
    http::routes()
        .with_state(ws_state.app.clone())
        .route("/ws", get(websocket::ws_handler).with_state(ws_state))
}
