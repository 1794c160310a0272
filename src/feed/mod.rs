//! Incremental polling of a single feed account.
//!
//! [`FeedSource`] is the upstream collaborator (account lookup and item
//! search); [`HttpFeedSource`] implements it over a Twitter-v2-style JSON API.
//! [`FeedPoller`] owns the watermark and turns repeated searches into a stream
//! of items that are each returned at most once.

mod error;
mod http;
mod poller;
mod source;

pub use error::FeedError;
pub use http::HttpFeedSource;
pub use poller::{FeedPoller, RetryPolicy};
pub use source::{FeedItem, FeedSource, SourceError};
