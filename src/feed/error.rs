//! Feed poller error types.

/// Errors surfaced by [`FeedPoller`](super::FeedPoller).
///
/// Transient unavailability is retried inside the poller and only shows up
/// here once the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The watched account does not exist.
    #[error("Feed account not found: {0}")]
    AccountNotFound(String),

    /// The upstream failed with a non-transient error.
    #[error("Feed upstream error: {0}")]
    Upstream(String),

    /// The upstream stayed unavailable for every allowed attempt.
    #[error("Feed upstream unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
}
