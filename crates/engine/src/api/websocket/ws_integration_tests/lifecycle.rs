use super::*;

#[tokio::test]
async fn checkmate_is_announced_then_everyone_is_disconnected() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, mut b, session_id) = matched_pair(addr).await;

    let moves = [
        (Side::A, "f2", "f3"),
        (Side::B, "e7", "e5"),
        (Side::A, "g2", "g4"),
    ];
    for (side, from, to) in moves {
        let mover = if side == Side::A { &mut a } else { &mut b };
        ws_send_client(mover, &ClientMessage::SubmitAction(Action::new(from, to))).await;
        for client in [&mut a, &mut b] {
            ws_expect_message(client, Duration::from_secs(2), |m| {
                matches!(m, ServerMessage::ActionResult(_))
            })
            .await;
        }
    }

    ws_send_client(&mut b, &ClientMessage::SubmitAction(Action::new("d8", "h4"))).await;

    for client in [&mut a, &mut b] {
        let seen = ws_expect_closed(client, Duration::from_secs(2)).await;
        let outcome = seen.iter().find_map(|m| match m {
            ServerMessage::ActionResult(result) => Some(result.outcome),
            _ => None,
        });
        assert_eq!(outcome, Some(Outcome::SideB));
    }

    // The finished session can no longer be joined.
    let mut late = ws_connect(addr, &format!("?gameId={session_id}")).await;
    let msg = ws_expect_message(&mut late, Duration::from_secs(2), is_error).await;
    assert_eq!(error_message(&msg), "Game not found");

    server.abort();
}

#[tokio::test]
async fn seat_disconnect_closes_the_rest_of_the_session() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (a, mut b, session_id) = matched_pair(addr).await;
    let mut watcher = ws_connect(addr, &format!("?gameId={session_id}&spectator=true")).await;
    ws_expect_message(&mut watcher, Duration::from_secs(2), is_init).await;

    drop(a);

    ws_expect_closed(&mut b, Duration::from_secs(2)).await;
    ws_expect_closed(&mut watcher, Duration::from_secs(2)).await;

    server.abort();
}

#[tokio::test]
async fn end_request_notifies_everyone_and_closes() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, mut b, _) = matched_pair(addr).await;

    ws_send_client(&mut a, &ClientMessage::End).await;

    for client in [&mut a, &mut b] {
        let seen = ws_expect_closed(client, Duration::from_secs(2)).await;
        assert!(seen.contains(&ServerMessage::ended("Game has ended")));
    }

    server.abort();
}

#[tokio::test]
async fn observer_leaving_does_not_disturb_the_game() {
    let (addr, server) = spawn_ws_server(chess_state()).await;
    let (mut a, mut b, session_id) = matched_pair(addr).await;
    let mut watcher = ws_connect(addr, &format!("?gameId={session_id}&spectator=true")).await;
    ws_expect_message(&mut watcher, Duration::from_secs(2), is_init).await;

    ws_send_client(&mut watcher, &ClientMessage::End).await;
    let seen = ws_expect_closed(&mut watcher, Duration::from_secs(2)).await;
    assert!(seen.contains(&ServerMessage::ended("Game has ended")));

    ws_send_client(&mut a, &ClientMessage::SubmitAction(Action::new("e2", "e4"))).await;
    ws_expect_message(&mut b, Duration::from_secs(2), |m| {
        matches!(m, ServerMessage::ActionResult(_))
    })
    .await;

    server.abort();
}
