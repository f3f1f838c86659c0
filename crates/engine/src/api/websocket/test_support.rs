use super::*;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};

use duelhall_domain::{ChessRules, RulesEngine};
use duelhall_shared::{ClientMessage, ServerMessage};

use crate::infrastructure::app_settings::EngineSettings;
use crate::infrastructure::clock::{FixedClock, SystemRandom};

pub(crate) type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

pub(crate) fn build_test_app(rules: Arc<dyn RulesEngine>) -> Arc<App> {
    let settings = EngineSettings {
        mailbox_capacity: 4,
        ..EngineSettings::default()
    };
    Arc::new(App::new(
        settings,
        rules,
        Arc::new(FixedClock(fixed_now())),
        Arc::new(SystemRandom::new()),
    ))
}

pub(crate) fn chess_state() -> Arc<WsState> {
    Arc::new(WsState::new(build_test_app(Arc::new(ChessRules::new()))))
}

pub(crate) async fn spawn_ws_server(
    state: Arc<WsState>,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = crate::api::router_with_state(state);

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, handle)
}

/// Connect to `/ws` with an optional query string (`"?gameId=..."`).
pub(crate) async fn ws_connect(addr: SocketAddr, query: &str) -> WsClient {
    let url = format!("ws://{}/ws{}", addr, query);
    let (ws, _resp) = connect_async(url).await.unwrap();
    ws
}

pub(crate) async fn ws_send_client(ws: &mut WsClient, msg: &ClientMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(WsMessage::Text(json.into())).await.unwrap();
}

pub(crate) async fn ws_send_raw(ws: &mut WsClient, json: &str) {
    ws.send(WsMessage::Text(json.to_string().into())).await.unwrap();
}

pub(crate) async fn ws_recv_server(ws: &mut WsClient) -> ServerMessage {
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        match msg {
            WsMessage::Text(text) => {
                return serde_json::from_str::<ServerMessage>(&text).unwrap();
            }
            WsMessage::Close(frame) => panic!("connection closed: {:?}", frame),
            _ => {}
        }
    }
}

pub(crate) async fn ws_expect_message<F>(
    ws: &mut WsClient,
    timeout: Duration,
    mut predicate: F,
) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            let msg = ws_recv_server(ws).await;
            if predicate(&msg) {
                return msg;
            }
        }
    })
    .await
    .unwrap()
}

pub(crate) async fn ws_expect_no_message_matching<F>(
    ws: &mut WsClient,
    timeout: Duration,
    mut predicate: F,
) where
    F: FnMut(&ServerMessage) -> bool,
{
    let result = tokio::time::timeout(timeout, async {
        loop {
            let msg = ws_recv_server(ws).await;
            if predicate(&msg) {
                panic!("unexpected message: {:?}", msg);
            }
        }
    })
    .await;

    // We only succeed if we timed out without seeing a matching message.
    assert!(result.is_err());
}

/// Read until the server closes the connection. Returns the messages seen.
pub(crate) async fn ws_expect_closed(ws: &mut WsClient, timeout: Duration) -> Vec<ServerMessage> {
    tokio::time::timeout(timeout, async {
        let mut seen = Vec::new();
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    seen.push(serde_json::from_str::<ServerMessage>(&text).unwrap());
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return seen,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("connection was not closed")
}

pub(crate) fn init_data(msg: &ServerMessage) -> &duelhall_shared::InitData {
    match msg {
        ServerMessage::Init(init) => init,
        other => panic!("expected init, got {other:?}"),
    }
}

pub(crate) fn error_message(msg: &ServerMessage) -> &str {
    match msg {
        ServerMessage::Error(data) => &data.message,
        other => panic!("expected error, got {other:?}"),
    }
}

pub(crate) fn is_init(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Init(_))
}

pub(crate) fn is_error(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Error(_))
}

/// Two clients matched through `init`; returns them with the session id.
pub(crate) async fn matched_pair(addr: SocketAddr) -> (WsClient, WsClient, String) {
    let mut a = ws_connect(addr, "").await;
    ws_send_client(&mut a, &ClientMessage::Init).await;
    let waiting = ws_expect_message(&mut a, Duration::from_secs(2), is_init).await;
    let session_id = init_data(&waiting).session_id.clone();

    let mut b = ws_connect(addr, "").await;
    ws_send_client(&mut b, &ClientMessage::Init).await;
    let b_init = ws_expect_message(&mut b, Duration::from_secs(2), is_init).await;
    assert_eq!(init_data(&b_init).session_id, session_id);

    let a_init = ws_expect_message(&mut a, Duration::from_secs(2), is_init).await;
    assert_eq!(init_data(&a_init).session_id, session_id);

    (a, b, session_id)
}
