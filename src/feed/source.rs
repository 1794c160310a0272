//! Feed source abstraction.

use async_trait::async_trait;

/// One post from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Upstream identifier; later posts have larger identifiers.
    pub id: u64,
    /// Post body.
    pub text: String,
}

impl FeedItem {
    #[must_use]
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Failure reported by a feed source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The account does not exist upstream.
    #[error("account not found")]
    NotFound,

    /// The upstream is temporarily unavailable; the same request may succeed
    /// later.
    #[error("upstream temporarily unavailable")]
    Unavailable,

    /// Any other upstream failure.
    #[error("{0}")]
    Other(String),
}

/// Upstream provider of feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Checks that `account` exists.
    async fn lookup_account(&self, account: &str) -> Result<(), SourceError>;

    /// Returns the account's visible items, in upstream order, restricted to
    /// identifiers greater than `since` when given.
    async fn search(&self, account: &str, since: Option<u64>)
        -> Result<Vec<FeedItem>, SourceError>;

    /// Public URL of the account, used when announcing items.
    fn profile_url(&self, account: &str) -> String;
}
