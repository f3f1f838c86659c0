//! Session error types

/// Error types for session operations.
///
/// `Display` is the exact text sent to the client in an `error` message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid move")]
    IllegalAction,

    #[error("Game not started")]
    NotActive,

    #[error("Spectators cannot make moves")]
    ObserverAction,

    #[error("Game not found")]
    NotFound,

    #[error("Game is full")]
    Full,

    #[error("Already in a game")]
    AlreadyAttached,

    #[error("Game has ended")]
    Ended,

    #[error("Spectator must provide a game ID")]
    ObserverRequiresSession,

    #[error("No active game to end")]
    NoActiveSession,

    /// Recipient's transport is gone
    #[error("Connection closed")]
    MailboxClosed,
}
