//! Relay loop forwarding new feed items to the chat channel.

mod error;
mod runner;

pub use error::RelayError;
pub use runner::{announce_line, quote_line, ChatSink, Relay};
