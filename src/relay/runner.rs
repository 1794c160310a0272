//! Timer-driven relay loop.

use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;

use crate::feed::{FeedPoller, FeedSource};
use crate::irc::{ChatSession, SessionError};

use super::RelayError;

/// Destination for relayed lines.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Sends one line to the channel.
    async fn message(&self, text: &str) -> Result<(), SessionError>;
}

#[async_trait]
impl ChatSink for ChatSession {
    async fn message(&self, text: &str) -> Result<(), SessionError> {
        ChatSession::message(self, text).await
    }
}

/// First line of a relayed item: where it comes from.
#[must_use]
pub fn announce_line(profile_url: &str) -> String {
    format!("sur {profile_url} :")
}

/// Second line of a relayed item: the quoted post.
#[must_use]
pub fn quote_line(text: &str) -> String {
    format!("« {text} »")
}

/// Polls the feed on a fixed interval and posts every new item to the chat.
pub struct Relay<S, C> {
    poller: FeedPoller<S>,
    chat: C,
    interval: Duration,
}

impl<S: FeedSource, C: ChatSink> Relay<S, C> {
    #[must_use]
    pub fn new(poller: FeedPoller<S>, chat: C, interval: Duration) -> Self {
        Self {
            poller,
            chat,
            interval,
        }
    }

    /// Runs one poll cycle and returns how many items were relayed.
    ///
    /// # Errors
    ///
    /// Returns the first feed or chat error; items after a failed send are
    /// not delivered.
    pub async fn poll_once(&mut self) -> Result<usize, RelayError> {
        let items = self.poller.new_items().await?;
        if items.is_empty() {
            return Ok(0);
        }

        let announce = announce_line(&self.poller.profile_url());
        for text in &items {
            self.chat.message(&announce).await?;
            self.chat.message(&quote_line(text)).await?;
        }
        tracing::info!(count = items.len(), "Relayed feed items");
        Ok(items.len())
    }

    /// Waits one interval, polls, and repeats until an error occurs.
    ///
    /// Feed and chat errors are not recovered here: the first one ends the
    /// loop and is returned to the caller.
    ///
    /// # Errors
    ///
    /// Always returns the error that stopped the loop.
    pub async fn run(mut self) -> Result<Infallible, RelayError> {
        tracing::info!(
            account = %self.poller.account(),
            interval_secs = self.interval.as_secs(),
            "Relay started"
        );
        loop {
            tokio::time::sleep(self.interval).await;
            self.poll_once().await?;
        }
    }

    #[must_use]
    pub fn poller(&self) -> &FeedPoller<S> {
        &self.poller
    }

    #[must_use]
    pub fn chat(&self) -> &C {
        &self.chat
    }
}
