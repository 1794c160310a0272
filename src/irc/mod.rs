//! Minimal IRC client session.
//!
//! The session performs registration and channel join, then posts messages to
//! that one channel. The only inbound traffic it reacts to is the server's
//! liveness check, which a background responder answers.
//!
//! # Protocol
//!
//! ```text
//! Client                              Server
//!   |-- NICK <nick> ------------------->|
//!   |-- USER <nick> 0 * : <real name> ->|
//!   |<-- :<server> 001 <nick> :Welcome -|
//!   |-- JOIN <channel> [<key>] -------->|
//!   |-- PRIVMSG <channel> :<greeting> ->|
//!   |          ... keepalive ...        |
//!   |<-- PING :<payload> ---------------|
//!   |-- PONG <payload> ---------------->|
//! ```
//!
//! Lines are CRLF-terminated on output; input accepts LF or CRLF.

mod error;
mod line;
mod session;
mod state;

pub use error::SessionError;
pub use line::ServerLine;
pub use session::{ChatSession, KeepaliveHandle, MAX_LINE_LEN};
pub use state::SessionState;
