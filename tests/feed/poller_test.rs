//! Tests for the watermark poller.

use std::sync::Arc;

use feed_relay::diagnostics::{DiagnosticEvent, Diagnostics, RecordingDiagnostics};
use feed_relay::feed::{FeedError, FeedPoller, SourceError};

use crate::common::{fast_retry, items, ScriptedSource};

async fn poller_with(
    source: &ScriptedSource,
    sink: &Arc<RecordingDiagnostics>,
) -> FeedPoller<ScriptedSource> {
    let diagnostics: Arc<dyn Diagnostics> = sink.clone();
    FeedPoller::initialize(source.clone(), "alice", fast_retry(3), diagnostics)
        .await
        .unwrap()
}

#[tokio::test]
async fn baseline_sets_watermark_to_max_visible_id() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(3, "c"), (7, "g"), (5, "e")])),
        // An upstream that ignores the lower bound.
        Ok(items(&[(3, "c"), (7, "g"), (5, "e")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    assert_eq!(poller.watermark(), 7);
    assert!(poller.new_items().await.unwrap().is_empty());
    assert_eq!(poller.watermark(), 7);
    assert_eq!(source.calls(), vec![None, Some(7)]);
}

#[tokio::test]
async fn empty_baseline_starts_at_zero() {
    let source = ScriptedSource::new(vec![Ok(Vec::new()), Ok(items(&[(1, "first")]))]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    assert_eq!(poller.watermark(), 0);
    assert_eq!(poller.new_items().await.unwrap(), vec!["first"]);
    assert_eq!(poller.watermark(), 1);
}

#[tokio::test]
async fn new_items_keep_upstream_order_and_advance_to_max() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Ok(items(&[(9, "hello"), (8, "world")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    let texts = poller.new_items().await.unwrap();

    assert_eq!(texts, vec!["hello", "world"]);
    assert_eq!(poller.watermark(), 9);
}

#[tokio::test]
async fn items_at_or_below_watermark_are_never_returned() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Ok(items(&[(5, "old"), (7, "same"), (8, "new")])),
        Ok(items(&[(8, "new"), (10, "newer")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    assert_eq!(poller.new_items().await.unwrap(), vec!["new"]);
    assert_eq!(poller.new_items().await.unwrap(), vec!["newer"]);
    assert_eq!(poller.watermark(), 10);
    assert_eq!(source.calls(), vec![None, Some(7), Some(8)]);
}

#[tokio::test]
async fn every_fetched_item_is_recorded_before_filtering() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Ok(items(&[(6, "stale"), (8, "fresh")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;
    poller.new_items().await.unwrap();

    assert_eq!(
        sink.events(),
        vec![
            DiagnosticEvent::Fetched {
                id: 6,
                text: "stale".to_string()
            },
            DiagnosticEvent::Fetched {
                id: 8,
                text: "fresh".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn transient_failure_is_retried_transparently() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Err(SourceError::Unavailable),
        Ok(items(&[(11, "after outage")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    let texts = poller.new_items().await.unwrap();

    assert_eq!(texts, vec!["after outage"]);
    assert_eq!(source.calls(), vec![None, Some(7), Some(7)]);
    assert_eq!(
        sink.events().first(),
        Some(&DiagnosticEvent::Unavailable { attempt: 1 })
    );
}

#[tokio::test]
async fn baseline_fetch_is_retried_too() {
    let source = ScriptedSource::new(vec![
        Err(SourceError::Unavailable),
        Err(SourceError::Unavailable),
        Ok(items(&[(4, "d")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let poller = poller_with(&source, &sink).await;

    assert_eq!(poller.watermark(), 4);
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test]
async fn prolonged_outage_surfaces_unavailable() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Err(SourceError::Unavailable),
        Err(SourceError::Unavailable),
        Err(SourceError::Unavailable),
        Err(SourceError::Unavailable),
        Ok(items(&[(8, "too late")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    let err = poller.new_items().await.unwrap_err();

    assert!(matches!(err, FeedError::Unavailable { attempts: 4 }));
    assert_eq!(poller.watermark(), 7);
    assert_eq!(source.calls().len(), 5);
}

#[tokio::test]
async fn non_transient_error_propagates_without_retry() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(7, "baseline")])),
        Err(SourceError::Other("HTTP 401 Unauthorized".to_string())),
        Ok(items(&[(8, "never fetched")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    let err = poller.new_items().await.unwrap_err();

    match err {
        FeedError::Upstream(message) => assert_eq!(message, "HTTP 401 Unauthorized"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(poller.watermark(), 7);
    assert_eq!(source.calls().len(), 2);
    assert_eq!(
        sink.events(),
        vec![DiagnosticEvent::Failed("HTTP 401 Unauthorized".to_string())]
    );
}

#[tokio::test]
async fn missing_account_is_fatal_and_not_retried() {
    let source = ScriptedSource::missing_account();
    let diagnostics: Arc<dyn Diagnostics> = Arc::new(RecordingDiagnostics::new());

    let result = FeedPoller::initialize(source.clone(), "ghost", fast_retry(3), diagnostics).await;

    match result {
        Err(FeedError::AccountNotFound(account)) => assert_eq!(account, "ghost"),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("initialize should fail"),
    }
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn watermark_never_decreases() {
    let source = ScriptedSource::new(vec![
        Ok(items(&[(20, "baseline")])),
        Ok(items(&[(3, "ancient")])),
        Ok(Vec::new()),
        Ok(items(&[(25, "x"), (21, "y")])),
    ]);
    let sink = Arc::new(RecordingDiagnostics::new());
    let mut poller = poller_with(&source, &sink).await;

    let mut previous = poller.watermark();
    for _ in 0..3 {
        poller.new_items().await.unwrap();
        assert!(poller.watermark() >= previous);
        previous = poller.watermark();
    }
    assert_eq!(poller.watermark(), 25);
}
