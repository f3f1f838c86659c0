use super::*;

#[tokio::test]
async fn two_inits_are_paired_into_one_session() {
    let (addr, server) = spawn_ws_server(chess_state()).await;

    let mut a = ws_connect(addr, "").await;
    ws_send_client(&mut a, &ClientMessage::Init).await;
    let waiting = ws_expect_message(&mut a, Duration::from_secs(2), is_init).await;
    let waiting = init_data(&waiting).clone();
    assert_eq!(waiting.role, Some(Side::A));
    assert_eq!(waiting.turn, Side::A);
    assert!(!waiting.observer);
    assert_eq!(
        waiting.observer_url,
        format!("/play/{}?spectator=true", waiting.session_id)
    );

    let mut b = ws_connect(addr, "").await;
    ws_send_client(&mut b, &ClientMessage::Init).await;
    let b_init = ws_expect_message(&mut b, Duration::from_secs(2), is_init).await;
    assert_eq!(init_data(&b_init).role, Some(Side::B));
    assert_eq!(init_data(&b_init).session_id, waiting.session_id);

    // Seat A is told again once the session fills.
    let a_init = ws_expect_message(&mut a, Duration::from_secs(2), is_init).await;
    assert_eq!(init_data(&a_init).role, Some(Side::A));
    assert_eq!(init_data(&a_init).time, fixed_now());

    server.abort();
}

#[tokio::test]
async fn third_client_joining_by_id_becomes_an_observer() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (_a, _b, session_id) = matched_pair(addr).await;

    let mut c = ws_connect(addr, &format!("?gameId={session_id}")).await;
    let init = ws_expect_message(&mut c, Duration::from_secs(2), is_init).await;
    let init = init_data(&init);
    assert!(init.observer);
    assert_eq!(init.role, None);
    assert_eq!(init.session_id, session_id);

    server.abort();
}

#[tokio::test]
async fn join_message_with_seat_flag_on_full_session_is_rejected() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (_a, _b, session_id) = matched_pair(addr).await;

    let mut c = ws_connect(addr, "").await;
    ws_send_client(
        &mut c,
        &ClientMessage::Join(JoinData {
            session_id,
            observer: false,
            seat: true,
        }),
    )
    .await;
    let msg = ws_expect_message(&mut c, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Game is full");

    server.abort();
}

#[tokio::test]
async fn spectator_without_game_id_is_told_and_kept_open() {
    let (addr, server) = spawn_ws_server(chess_state()).await;

    let mut c = ws_connect(addr, "?spectator=true").await;
    let msg = ws_expect_message(&mut c, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Spectator must provide a game ID");

    // Still usable for matchmaking.
    ws_send_client(&mut c, &ClientMessage::Init).await;
    ws_expect_message(&mut c, Duration::from_secs(2), is_init).await;

    server.abort();
}

#[tokio::test]
async fn unknown_game_id_is_not_found() {
    let (addr, server) = spawn_ws_server(chess_state()).await;

    let mut c = ws_connect(addr, "?gameId=zzzzzz").await;
    let msg = ws_expect_message(&mut c, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Game not found");

    server.abort();
}

#[tokio::test]
async fn duplicate_live_connection_is_refused() {
    use tokio::net::TcpSocket;
    use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Error as WsError};

    use crate::api::connections::ConnectionKey;
    use crate::infrastructure::session::Participant;

    let state = chess_state();
    let (addr, server) = spawn_ws_server(state.clone()).await;

    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let local = socket.local_addr().unwrap();

    let (holder, _holder_rx) = Participant::connect(Some(local), 4);
    let key = ConnectionKey::new(Some("abc123".into()), local);
    assert!(state.connections.try_register(key, holder));

    let stream = socket.connect(addr).await.unwrap();
    let request = format!("ws://{addr}/ws?gameId=abc123")
        .as_str()
        .into_client_request()
        .unwrap();
    match tokio_tungstenite::client_async(request, stream).await {
        Err(WsError::Http(resp)) => assert_eq!(resp.status().as_u16(), 409),
        Err(other) => panic!("expected HTTP 409, got {other}"),
        Ok(_) => panic!("duplicate connection was accepted"),
    }

    server.abort();
}
