//! Relay error type.

use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::irc::SessionError;

/// Any condition that ends a relay run. None of them are recovered.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
