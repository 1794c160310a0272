//! Session lifecycle state.

use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle of a chat session.
///
/// `Disconnected -> Connecting -> Registered -> Joined -> Active`. Any
/// unrecovered socket error moves the session to `Faulted`; stopping the
/// keepalive responder moves it to `Stopped`. Both are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Registered,
    Joined,
    Active,
    Stopped,
    Faulted,
}

impl SessionState {
    /// Whether the session can never become usable again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Faulted)
    }
}

/// State shared between the session and its keepalive responder.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedState {
    inner: Arc<Mutex<SessionState>>,
}

impl SharedState {
    pub(crate) fn get(&self) -> SessionState {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transition(&self, new_state: SessionState) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return;
        }
        tracing::debug!(from = ?*state, to = ?new_state, "Session state transition");
        *state = new_state;
    }

    pub(crate) fn fault(&self) {
        self.transition(SessionState::Faulted);
    }

    pub(crate) fn stop(&self) {
        self.transition(SessionState::Stopped);
    }
}
