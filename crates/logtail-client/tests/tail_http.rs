//! End-to-end tail over HTTP against a range-serving fake server.

use logtail_client::{HttpRangeFetcher, TailController};
use logtail_core::{FetchError, RangeRequest, TailConfig, TailState};
use logtail_test_utils::{lines_text, MemoryLog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const LOG_PATH: &str = "/v1/log/role/web/log.1.txt";

/// Serves a [`MemoryLog`] honouring `Range` headers
struct ServeLog(MemoryLog);

fn parse_range(value: &str) -> Option<RangeRequest> {
    let ranges = value.strip_prefix("bytes=")?;
    let (start, end) = ranges.split_once('-')?;
    if start.is_empty() {
        return end.parse().ok().map(RangeRequest::suffix);
    }
    Some(RangeRequest::span(start.parse().ok()?, end.parse().ok()?))
}

impl Respond for ServeLog {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_range);
        let Some(range) = range else {
            return ResponseTemplate::new(200).set_body_bytes(self.0.contents());
        };
        match self.0.serve(range) {
            Ok(chunk) => ResponseTemplate::new(206)
                .insert_header(
                    "content-range",
                    format!("bytes {}-{}/{}", chunk.offset, chunk.end() - 1, chunk.total),
                )
                .set_body_bytes(chunk.bytes),
            Err(FetchError::EmptyFile { total }) => ResponseTemplate::new(416)
                .insert_header("content-range", format!("bytes */{total}")),
            Err(_) => ResponseTemplate::new(500),
        }
    }
}

async fn log_server(log: &MemoryLog) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(ServeLog(log.clone()))
        .mount(&server)
        .await;
    server
}

async fn wait_until(
    updates: &mut watch::Receiver<Arc<TailState>>,
    condition: impl FnMut(&Arc<TailState>) -> bool,
) {
    timeout(Duration::from_secs(5), updates.wait_for(condition))
        .await
        .expect("timed out waiting for state")
        .expect("controller stopped");
}

#[tokio::test]
async fn follows_a_growing_log() {
    let log = MemoryLog::with_lines(50);
    let server = log_server(&log).await;

    let config = TailConfig::new()
        .with_chunk_size(64)
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(20));
    let fetcher = Arc::new(HttpRangeFetcher::from_config(&config).expect("client"));
    let url = format!("{}{LOG_PATH}", server.uri());
    let (handle, task) = TailController::new(url, fetcher, config).spawn();
    let mut updates = handle.subscribe();

    wait_until(&mut updates, |s| s.is_loaded()).await;
    let state = handle.state();
    assert_eq!(state.end(), Some(log.len()));
    assert!(lines_text(0, 50).ends_with(state.text()));

    log.append("line 50\nline 51\n");
    wait_until(&mut updates, |s| s.text().ends_with("line 51\n")).await;
    let first_start = handle.state().byte_offset.expect("loaded");

    handle.load_previous();
    wait_until(&mut updates, |s| {
        s.byte_offset.is_some_and(|start| start < first_start)
    })
    .await;
    assert!(lines_text(0, 52).ends_with(handle.state().text()));

    handle.cancel();
    task.await.expect("controller task");

    let requests = server.received_requests().await.expect("recording enabled");
    let first = requests[0]
        .headers
        .get("range")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    assert_eq!(first.as_deref(), Some("bytes=-64"));
}

#[tokio::test]
async fn empty_log_then_first_write() {
    let log = MemoryLog::new();
    let server = log_server(&log).await;

    let config = TailConfig::new()
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(20));
    let fetcher = Arc::new(HttpRangeFetcher::from_config(&config).expect("client"));
    let url = format!("{}{LOG_PATH}", server.uri());
    let (handle, task) = TailController::new(url, fetcher, config).spawn();
    let mut updates = handle.subscribe();

    wait_until(&mut updates, |s| !s.loading).await;
    let state = handle.state();
    assert!(!state.is_loaded());
    assert!(!state.has_error());

    log.append("hello\n");
    wait_until(&mut updates, |s| s.text() == "hello\n").await;

    handle.cancel();
    task.await.expect("controller task");
}

#[tokio::test]
async fn server_errors_are_annotated_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = TailConfig::new()
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(20));
    let fetcher = Arc::new(HttpRangeFetcher::from_config(&config).expect("client"));
    let url = format!("{}{LOG_PATH}", server.uri());
    let (handle, task) = TailController::new(url, fetcher, config).spawn();
    let mut updates = handle.subscribe();

    wait_until(&mut updates, |s| s.has_error()).await;
    assert_eq!(handle.state().error.as_ref().and_then(|e| e.status), Some(503));

    // still polling
    timeout(Duration::from_secs(5), async {
        while server.received_requests().await.map_or(0, |r| r.len()) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("polling continued");

    handle.cancel();
    task.await.expect("controller task");
}
