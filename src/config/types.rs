//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// IRC side: server, identity and channel.
    pub irc: IrcConfig,
    /// Feed side: the watched account and upstream API.
    pub feed: FeedConfig,
    /// Polling and retry timing.
    #[serde(default)]
    pub relay: PollConfig,
}

impl RelayConfig {
    /// Checks the fields that have no usable default.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.irc.server.trim().is_empty() {
            return Err("irc.server must not be empty".to_string());
        }
        if self.irc.port == 0 {
            return Err("irc.port must not be 0".to_string());
        }
        if self.irc.channel.trim().is_empty() {
            return Err("irc.channel must not be empty".to_string());
        }
        if self.irc.nick.trim().is_empty() || self.irc.nick.contains(' ') {
            return Err("irc.nick must be a single non-empty word".to_string());
        }
        if self.feed.account.trim().is_empty() {
            return Err("feed.account must not be empty".to_string());
        }
        if self.relay.poll_interval_secs == 0 {
            return Err("relay.poll_interval_secs must not be 0".to_string());
        }
        Ok(())
    }
}

/// Connection settings for the IRC session. Immutable once the session owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrcConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub channel: String,
    /// Channel key sent with `JOIN`.
    #[serde(default)]
    pub password: Option<String>,
    pub nick: String,
    #[serde(default = "default_real_name")]
    pub real_name: String,
    /// First message posted to the channel after joining.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl IrcConfig {
    /// Channel key, ignoring an empty string.
    #[must_use]
    pub fn channel_key(&self) -> Option<&str> {
        self.password
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn default_port() -> u16 {
    6667
}

fn default_real_name() -> String {
    "Feed Relay".to_string()
}

fn default_greeting() -> String {
    "coucou".to_string()
}

/// Settings for the watched feed account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    /// Account handle whose posts are relayed.
    pub account: String,
    /// Base URL of the feed API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL of public profile pages, used in announcements.
    #[serde(default = "default_profile_base_url")]
    pub profile_base_url: String,
    /// Environment variable holding the API bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_base_url() -> String {
    "https://api.twitter.com/2".to_string()
}

fn default_profile_base_url() -> String {
    "https://twitter.com".to_string()
}

fn default_token_env() -> String {
    "FEED_BEARER_TOKEN".to_string()
}

/// Polling cadence and transient-failure retry policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds to wait between two polls of the feed.
    pub poll_interval_secs: u64,
    /// Seconds to wait before retrying an unavailable upstream.
    pub retry_delay_secs: u64,
    /// Retries allowed after the first failed attempt of a single fetch.
    pub max_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            retry_delay_secs: 2,
            max_retries: 30,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
