//! Deterministic rules engine and mailbox helpers for session tests.

use std::time::Duration;

use tokio::sync::mpsc;

use duelhall_domain::{Action, Outcome, Position, RulesEngine, RulesError, Side};
use duelhall_shared::ServerMessage;

use super::Participant;

/// Rules engine driven by the action text.
///
/// - `from == "xx"` is rejected as illegal
/// - `to == "win"` wins for the mover
/// - `to == "draw"` draws
/// - anything else is a plain move
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScriptedRules;

impl RulesEngine for ScriptedRules {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn new_position(&self) -> Box<dyn Position> {
        Box::new(ScriptedPosition::default())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ScriptedPosition {
    plies: u32,
    outcome: Outcome,
}

impl Position for ScriptedPosition {
    fn turn(&self) -> Side {
        if self.plies % 2 == 0 {
            Side::A
        } else {
            Side::B
        }
    }

    fn apply_action(&self, action: &Action) -> Result<Box<dyn Position>, RulesError> {
        if self.outcome.is_terminal() {
            return Err(RulesError::AlreadyDecided);
        }
        if action.from == "xx" {
            return Err(RulesError::illegal(action.to_string()));
        }
        let outcome = match action.to.as_str() {
            "win" => Outcome::win_for(self.turn()),
            "draw" => Outcome::Draw,
            _ => Outcome::None,
        };
        Ok(Box::new(ScriptedPosition {
            plies: self.plies + 1,
            outcome,
        }))
    }

    fn classify_outcome(&self) -> Outcome {
        self.outcome
    }

    fn notation(&self) -> String {
        format!("plies={} outcome={}", self.plies, self.outcome)
    }
}

/// Participant with a roomy mailbox so tests never stall the actors.
pub(crate) fn participant() -> (Participant, mpsc::Receiver<ServerMessage>) {
    Participant::connect(None, 16)
}

pub(crate) async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("mailbox closed")
}

/// Drain everything currently queued.
pub(crate) fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

pub(crate) fn error_text(message: &ServerMessage) -> Option<&str> {
    match message {
        ServerMessage::Error(data) => Some(data.message.as_str()),
        _ => None,
    }
}
