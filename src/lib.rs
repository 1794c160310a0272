//! Feed Relay - relays new posts from a watched feed account into an IRC channel.

pub mod config;
pub mod diagnostics;
pub mod feed;
pub mod irc;
pub mod relay;
