//! TailController driven through its handle, with the clock paused.

use logtail_client::{MemoryQueryStore, TailController};
use logtail_core::{QueryStore, RangeRequest, TailConfig};
use logtail_test_utils::{lines_text, MemoryLog, MemoryRangeFetcher};
use std::sync::Arc;
use std::time::Duration;

const URL: &str = "http://logs.test/v1/log/changes/log.7.txt";

fn fetcher(log: &MemoryLog) -> Arc<MemoryRangeFetcher> {
    Arc::new(MemoryRangeFetcher::new(log.clone()))
}

#[tokio::test(start_paused = true)]
async fn follow_picks_up_appended_lines() {
    let log = MemoryLog::with_lines(5);
    let fetcher = fetcher(&log);
    let config = TailConfig::new()
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(500));
    let (handle, task) = TailController::new(URL, fetcher.clone(), config).spawn();
    let mut updates = handle.subscribe();

    updates.wait_for(|s| s.is_loaded()).await.unwrap();
    assert_eq!(handle.state().text(), lines_text(0, 5));

    log.append("line 5\n");
    updates
        .wait_for(|s| s.text().ends_with("line 5\n"))
        .await
        .unwrap();
    assert_eq!(handle.state().text(), lines_text(0, 6));

    handle.cancel();
    task.await.unwrap();
    assert!(handle.is_closed());
    assert_eq!(fetcher.active(), 0);
    assert_eq!(fetcher.max_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_aborts_the_pending_fetch() {
    let log = MemoryLog::with_lines(5);
    let fetcher = fetcher(&log);
    fetcher.hold();
    let (handle, task) = TailController::new(URL, fetcher.clone(), TailConfig::new()).spawn();

    while fetcher.active() == 0 {
        tokio::task::yield_now().await;
    }

    handle.cancel();
    handle.cancel();
    task.await.unwrap();

    assert_eq!(fetcher.active(), 0);
    assert_eq!(fetcher.completed(), 0);
    assert!(handle.state().loading);

    // ignored once stopped
    handle.cancel();
    handle.set_follow(true);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_and_clears_query() {
    let log = MemoryLog::with_lines(50);
    let store = Arc::new(MemoryQueryStore::with("offset", "70"));
    let config = TailConfig::new().with_chunk_size(64);
    let (handle, task) = TailController::new(URL, fetcher(&log), config)
        .with_query(store.clone())
        .spawn();

    let mut updates = handle.subscribe();
    updates.wait_for(|s| s.is_loaded()).await.unwrap();
    assert_eq!(handle.state().byte_offset, Some(70));
    assert_eq!(store.get("offset").as_deref(), Some("70"));

    drop(handle);
    task.await.unwrap();
    assert_eq!(store.get("offset"), None);
}

#[tokio::test(start_paused = true)]
async fn commands_during_fetch_are_serialised() {
    let log = MemoryLog::with_lines(200);
    let fetcher = fetcher(&log);
    let config = TailConfig::new().with_chunk_size(128);
    let (handle, task) = TailController::new(URL, fetcher.clone(), config).spawn();
    let mut updates = handle.subscribe();
    updates.wait_for(|s| s.is_loaded()).await.unwrap();
    let start = handle.state().byte_offset.unwrap();

    fetcher.hold();
    handle.load_previous();
    while fetcher.active() == 0 {
        tokio::task::yield_now().await;
    }
    handle.jump_to(0);
    handle.set_follow(true);
    updates.wait_for(|s| s.follow).await.unwrap();
    assert_eq!(fetcher.request_count(), 2);
    fetcher.release();

    updates
        .wait_for(|s| s.follow && s.byte_offset.is_some_and(|b| b < start))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // the jump to 0 was superseded by skip-to-end before it went out
    assert_eq!(
        fetcher.requests(),
        vec![
            RangeRequest::suffix(128),
            RangeRequest::span(start - 128, start - 1),
            RangeRequest::span(log.len() - 128, log.len() + 128),
        ]
    );
    assert_eq!(fetcher.max_active(), 1);
    assert!(handle.state().at_end());

    handle.cancel();
    task.await.unwrap();
}
