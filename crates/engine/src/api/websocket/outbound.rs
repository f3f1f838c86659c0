//! Outbound pump: participant mailbox -> socket frames.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, timeout_at, Instant, MissedTickBehavior};

use duelhall_shared::ServerMessage;

use crate::infrastructure::app_settings::EngineSettings;
use crate::infrastructure::session::Participant;

/// Liveness timing for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    /// Probe an idle connection this often
    pub ping_period: Duration,
    /// Give up after this long without an inbound frame
    pub pong_wait: Duration,
}

impl From<&EngineSettings> for PumpSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            ping_period: settings.ping_period,
            pong_wait: settings.pong_wait,
        }
    }
}

/// Drain `mailbox` onto `sink` until the participant closes, a write fails
/// or the peer goes silent for longer than `pong_wait`.
///
/// Every tick sends a ping, so a peer that only reads still produces pongs.
/// Each write must finish before the liveness deadline; a peer that stops
/// reading is dropped instead of stalling the pump.
///
/// Messages already queued when the pump stops are still written, then a
/// close frame is sent.
pub async fn run_outbound<S>(
    participant: Participant,
    mut mailbox: mpsc::Receiver<ServerMessage>,
    mut sink: S,
    settings: PumpSettings,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let id = participant.id();
    let mut ticker = interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline = liveness_deadline(&participant, settings);

        let result = tokio::select! {
            biased;
            _ = participant.closed() => break,
            message = mailbox.recv() => {
                let Some(message) = message else { break };
                write(&mut sink, &message, &participant, settings).await
            }
            _ = ticker.tick() => {
                let ping = Message::Ping(Default::default());
                send_frame(&mut sink, ping, &participant, settings).await
            }
            _ = sleep_until(deadline) => {
                if participant.liveness().idle() >= settings.pong_wait {
                    tracing::info!(participant_id = %id, "Liveness timeout");
                    break;
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::info!(participant_id = %id, error = %e, "WebSocket write failed");
            break;
        }
    }

    participant.close();

    // Flush what was handed over before the close, within what is left of
    // the liveness window.
    while let Ok(message) = mailbox.try_recv() {
        if let Err(e) = write(&mut sink, &message, &participant, settings).await {
            tracing::debug!(participant_id = %id, error = %e, "Flush abandoned");
            break;
        }
    }
    let _ = send_frame(&mut sink, Message::Close(None), &participant, settings).await;
    let _ = timeout_at(liveness_deadline(&participant, settings), sink.close()).await;
    tracing::debug!(participant_id = %id, "Outbound pump stopped");
}

fn liveness_deadline(participant: &Participant, settings: PumpSettings) -> Instant {
    participant.liveness().last_seen() + settings.pong_wait
}

/// Why a frame did not reach the socket.
#[derive(Debug)]
enum WriteError<E> {
    Sink(E),
    /// The peer stopped draining the socket and went silent
    Stalled,
}

impl<E: Display> Display for WriteError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Sink(e) => write!(f, "{e}"),
            WriteError::Stalled => f.write_str("write stalled past the liveness deadline"),
        }
    }
}

/// Send one frame, giving up once the liveness deadline passes.
///
/// Inbound frames that arrive while the write is pending push the deadline
/// out.
async fn send_frame<S>(
    sink: &mut S,
    frame: Message,
    participant: &Participant,
    settings: PumpSettings,
) -> Result<(), WriteError<S::Error>>
where
    S: Sink<Message> + Unpin,
{
    let mut send = sink.send(frame);
    loop {
        let deadline = liveness_deadline(participant, settings);
        match timeout_at(deadline, &mut send).await {
            Ok(result) => return result.map_err(WriteError::Sink),
            Err(_) if liveness_deadline(participant, settings) > deadline => continue,
            Err(_) => return Err(WriteError::Stalled),
        }
    }
}

/// Write one message as a text frame. Encode failures drop the message.
async fn write<S>(
    sink: &mut S,
    message: &ServerMessage,
    participant: &Participant,
    settings: PumpSettings,
) -> Result<(), WriteError<S::Error>>
where
    S: Sink<Message> + Unpin,
{
    match message.to_json() {
        Ok(json) => send_frame(sink, Message::Text(json.into()), participant, settings).await,
        Err(e) => {
            tracing::error!(kind = message.kind(), error = %e, "Failed to encode message, dropping");
            Ok(())
        }
    }
}
