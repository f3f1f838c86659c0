use super::*;

fn is_action_result(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::ActionResult(_))
}

#[tokio::test]
async fn accepted_move_reaches_both_seats_and_observers() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, mut b, session_id) = matched_pair(addr).await;
    let mut watcher = ws_connect(addr, &format!("?gameId={session_id}&spectator=true")).await;
    ws_expect_message(&mut watcher, Duration::from_secs(2), is_init).await;

    ws_send_client(&mut a, &ClientMessage::SubmitAction(Action::new("e2", "e4"))).await;

    for client in [&mut a, &mut b, &mut watcher] {
        let msg = ws_expect_message(client, Duration::from_secs(2), is_action_result).await;
        match msg {
            ServerMessage::ActionResult(result) => {
                assert_eq!(result.action, Action::new("e2", "e4"));
                assert_eq!(result.outcome, Outcome::None);
            }
            other => panic!("expected action-result, got {other:?}"),
        }
    }

    server.abort();
}

#[tokio::test]
async fn move_out_of_turn_is_rejected_for_the_sender_only() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, mut b, _) = matched_pair(addr).await;

    ws_send_client(&mut b, &ClientMessage::SubmitAction(Action::new("e7", "e5"))).await;
    let msg = ws_expect_message(&mut b, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Not your turn");

    ws_expect_no_message_matching(&mut a, Duration::from_millis(200), |m| {
        is_error(m) || is_action_result(m)
    })
    .await;

    server.abort();
}

#[tokio::test]
async fn illegal_move_is_rejected() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, _b, _) = matched_pair(addr).await;

    ws_send_client(&mut a, &ClientMessage::SubmitAction(Action::new("e2", "e5"))).await;
    let msg = ws_expect_message(&mut a, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Invalid move");

    // Turn did not pass.
    ws_send_client(&mut a, &ClientMessage::SubmitAction(Action::new("e2", "e4"))).await;
    ws_expect_message(&mut a, Duration::from_secs(2), is_action_result).await;

    server.abort();
}

#[tokio::test]
async fn malformed_move_payload_gets_format_error() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, _b, _) = matched_pair(addr).await;

    ws_send_raw(&mut a, r#"{"kind":"submit-action","payload":"e2e4"}"#).await;
    let msg = ws_expect_message(&mut a, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Invalid move format");

    ws_send_raw(&mut a, r#"{"kind":"castle"}"#).await;
    let msg = ws_expect_message(&mut a, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Invalid request type");

    server.abort();
}

#[tokio::test]
async fn observer_cannot_move() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (_a, _b, session_id) = matched_pair(addr).await;
    let mut watcher = ws_connect(addr, &format!("?gameId={session_id}&spectator=true")).await;
    ws_expect_message(&mut watcher, Duration::from_secs(2), is_init).await;

    ws_send_client(
        &mut watcher,
        &ClientMessage::SubmitAction(Action::new("e2", "e4")),
    )
    .await;
    let msg = ws_expect_message(&mut watcher, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Spectators cannot make moves");

    server.abort();
}
