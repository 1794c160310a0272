//! Session error types.

use super::SessionState;

/// Errors that can occur on a chat session. None of them are recovered:
/// the session never reconnects.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server closed the socket before registration completed.
    #[error("IRC connection closed before registration completed")]
    Connect,

    /// The server closed the socket after registration.
    #[error("IRC connection closed by server")]
    Closed,

    /// Writing a message to the socket failed.
    #[error("Failed to send message: {0}")]
    Send(#[source] std::io::Error),

    /// A message was sent on a session that is not active.
    #[error("Session is not active (state: {0:?})")]
    NotActive(SessionState),

    /// Keepalive was started on a session that is not joined.
    #[error("Keepalive requires a joined session (state: {0:?})")]
    NotJoined(SessionState),

    /// The keepalive responder task panicked or was aborted.
    #[error("Keepalive responder failed: {0}")]
    Responder(String),

    /// Socket I/O error.
    #[error("IRC I/O error: {0}")]
    Io(#[from] std::io::Error),
}
