//! Tests for the relay loop.

use std::sync::Arc;
use std::time::Duration;

use feed_relay::diagnostics::{Diagnostics, RecordingDiagnostics};
use feed_relay::feed::{FeedError, FeedPoller, SourceError};
use feed_relay::irc::SessionError;
use feed_relay::relay::{Relay, RelayError};

use crate::common::{fast_retry, items, RecordingChat, ScriptedSource};

async fn poller(source: &ScriptedSource) -> FeedPoller<ScriptedSource> {
    let diagnostics: Arc<dyn Diagnostics> = Arc::new(RecordingDiagnostics::new());
    FeedPoller::initialize(source.clone(), "alice", fast_retry(2), diagnostics)
        .await
        .unwrap()
}

#[tokio::test]
async fn each_item_becomes_announce_and_quote_lines() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Ok(items(&[(9, "hello"), (8, "world")])),
    ]);
    let mut relay = Relay::new(
        poller(&source).await,
        RecordingChat::default(),
        Duration::from_millis(1),
    );

    let relayed = relay.poll_once().await.unwrap();

    assert_eq!(relayed, 2);
    assert_eq!(
        relay.chat().lines(),
        vec![
            "sur https://twitter.com/alice :",
            "« hello »",
            "sur https://twitter.com/alice :",
            "« world »",
        ]
    );
    assert_eq!(relay.poller().watermark(), 9);
}

#[tokio::test]
async fn quiet_cycle_sends_nothing() {
    let source = ScriptedSource::new(vec![Ok(items(&[(7, "baseline")]))]);
    let mut relay = Relay::new(
        poller(&source).await,
        RecordingChat::default(),
        Duration::from_millis(1),
    );

    assert_eq!(relay.poll_once().await.unwrap(), 0);
    assert!(relay.chat().lines().is_empty());
}

#[tokio::test]
async fn run_delivers_then_stops_on_feed_error() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(1, "baseline")])),
        Ok(items(&[(2, "first")])),
        Err(SourceError::Unavailable),
        Ok(items(&[(3, "second")])),
        Err(SourceError::Other("HTTP 500".to_string())),
        Ok(items(&[(4, "never relayed")])),
    ]);
    let relay = Relay::new(
        poller(&source).await,
        RecordingChat::default(),
        Duration::from_millis(1),
    );

    let err = tokio::time::timeout(Duration::from_secs(5), relay.run())
        .await
        .expect("relay should stop on the feed error")
        .unwrap_err();

    assert!(matches!(err, RelayError::Feed(FeedError::Upstream(_))));
    // The fatal fetch is not retried.
    assert_eq!(source.calls().len(), 5);
}

#[tokio::test]
async fn send_failure_stops_delivery() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(1, "baseline")])),
        Ok(items(&[(2, "first"), (3, "second")])),
    ]);
    let mut relay = Relay::new(
        poller(&source).await,
        RecordingChat::failing_after(3),
        Duration::from_millis(1),
    );

    let err = relay.poll_once().await.unwrap_err();

    assert!(matches!(err, RelayError::Session(SessionError::Send(_))));
    assert_eq!(
        relay.chat().lines(),
        vec!["sur https://twitter.com/alice :", "« first »", "sur https://twitter.com/alice :"]
    );
}
