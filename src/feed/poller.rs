//! Watermark-based incremental feed poller.

use std::sync::Arc;
use std::time::Duration;

use super::{FeedError, FeedItem, FeedSource, SourceError};
use crate::config::PollConfig;
use crate::diagnostics::Diagnostics;

/// Fixed-delay retry policy for transient upstream unavailability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between two attempts.
    pub delay: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_retries: 30,
        }
    }
}

impl From<&PollConfig> for RetryPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            delay: config.retry_delay(),
            max_retries: config.max_retries,
        }
    }
}

/// Polls one account and hands out each new item exactly once.
///
/// The watermark is the highest identifier seen so far. It starts at the
/// highest identifier visible when the poller is initialized, so existing
/// history is never replayed, and it only ever increases.
pub struct FeedPoller<S> {
    source: S,
    account: String,
    watermark: u64,
    retry: RetryPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<S: FeedSource> FeedPoller<S> {
    /// Verifies the account and records the baseline watermark.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::AccountNotFound`] if the account does not exist
    /// (not retried), and the usual fetch errors for the baseline search.
    pub async fn initialize(
        source: S,
        account: impl Into<String>,
        retry: RetryPolicy,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, FeedError> {
        let account = account.into();

        match source.lookup_account(&account).await {
            Ok(()) => {}
            Err(SourceError::NotFound) => {
                tracing::error!(account = %account, "Account not found on feed");
                return Err(FeedError::AccountNotFound(account));
            }
            Err(e) => {
                diagnostics.upstream_failed(&account, &e.to_string());
                return Err(FeedError::Upstream(e.to_string()));
            }
        }

        let mut poller = Self {
            source,
            account,
            watermark: 0,
            retry,
            diagnostics,
        };

        let baseline = poller.fetch(None).await?;
        poller.watermark = baseline.iter().map(|item| item.id).max().unwrap_or(0);

        tracing::info!(
            account = %poller.account,
            visible = baseline.len(),
            watermark = poller.watermark,
            "Connected to feed"
        );
        Ok(poller)
    }

    /// Returns the texts of items posted since the last call, in upstream
    /// order.
    ///
    /// Items at or below the watermark held when the call started are
    /// dropped, even if upstream returns them.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Upstream`] on a non-transient upstream error and
    /// [`FeedError::Unavailable`] once the retry budget is spent. The
    /// watermark is unchanged in both cases.
    pub async fn new_items(&mut self) -> Result<Vec<String>, FeedError> {
        let floor = self.watermark;
        let fetched = self.fetch(Some(floor)).await?;

        let mut texts = Vec::new();
        for item in fetched {
            self.diagnostics.item_fetched(&self.account, &item);
            if item.id <= floor {
                continue;
            }
            self.watermark = self.watermark.max(item.id);
            texts.push(item.text);
        }

        if !texts.is_empty() {
            tracing::debug!(
                count = texts.len(),
                watermark = self.watermark,
                "Fetched new feed items"
            );
        }
        Ok(texts)
    }

    /// Runs one search, retrying while the upstream is unavailable.
    async fn fetch(&self, since: Option<u64>) -> Result<Vec<FeedItem>, FeedError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.source.search(&self.account, since).await {
                Ok(items) => return Ok(items),
                Err(SourceError::Unavailable) => {
                    self.diagnostics.upstream_unavailable(&self.account, attempt);
                    if attempt > self.retry.max_retries {
                        return Err(FeedError::Unavailable { attempts: attempt });
                    }
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    self.diagnostics.upstream_failed(&self.account, &e.to_string());
                    return Err(FeedError::Upstream(e.to_string()));
                }
            }
        }
    }

    /// Highest identifier observed so far.
    #[must_use]
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Public URL of the watched account.
    #[must_use]
    pub fn profile_url(&self) -> String {
        self.source.profile_url(&self.account)
    }
}
