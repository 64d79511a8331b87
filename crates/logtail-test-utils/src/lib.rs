//! Testing utilities for logtail workspace
//!
//! In-memory range server and viewport fakes.

#![allow(missing_docs)]

use logtail_core::viewport::{ScrollNotifier, ScrollSubscription, Viewport};
use logtail_core::{Chunk, FetchError, RangeFetcher, RangeRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Growable in-memory log file
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl AsRef<[u8]>) -> Self {
        let log = Self::new();
        log.append(content);
        log
    }

    /// Log of `lines` numbered lines: `line 0\nline 1\n...`
    pub fn with_lines(lines: usize) -> Self {
        let text: String = (0..lines).map(|i| format!("line {i}\n")).collect();
        Self::with_content(text)
    }

    pub fn append(&self, content: impl AsRef<[u8]>) {
        self.data.lock().extend_from_slice(content.as_ref());
    }

    pub fn truncate(&self, len: usize) {
        self.data.lock().truncate(len);
    }

    pub fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Serve `range` the way an HTTP file server would
    pub fn serve(&self, range: RangeRequest) -> Result<Chunk, FetchError> {
        let data = self.data.lock();
        let len = data.len() as u64;
        let (start, end) = match range {
            RangeRequest::Suffix { len: want } => (len.saturating_sub(want), len),
            RangeRequest::Span { start, end } => (start, end.saturating_add(1).min(len)),
        };
        if len == 0 || start >= len || start >= end {
            return Err(FetchError::EmptyFile { total: len });
        }
        Ok(Chunk::new(
            start,
            data[start as usize..end as usize].to_vec(),
            len,
        ))
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Range fetcher backed by a [`MemoryLog`]
///
/// Records every request, can fail on demand, and can hold requests
/// in flight until released.
#[derive(Debug)]
pub struct MemoryRangeFetcher {
    log: MemoryLog,
    requests: Mutex<Vec<RangeRequest>>,
    failures: Mutex<VecDeque<FetchError>>,
    held: watch::Sender<bool>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

impl MemoryRangeFetcher {
    pub fn new(log: MemoryLog) -> Self {
        let (held, _) = watch::channel(false);
        Self {
            log,
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            held,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn log(&self) -> &MemoryLog {
        &self.log
    }

    /// Ranges requested so far, in order
    pub fn requests(&self) -> Vec<RangeRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RangeRequest> {
        self.requests.lock().last().copied()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Fail the next fetch with `error`
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    /// Keep subsequent fetches pending until [`release`](Self::release)
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    pub fn release(&self) {
        self.held.send_replace(false);
    }

    /// Fetches currently pending
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously pending fetches observed
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Fetches that ran to completion
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RangeFetcher for MemoryRangeFetcher {
    async fn fetch(&self, _url: &str, range: RangeRequest) -> Result<Chunk, FetchError> {
        self.requests.lock().push(range);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let mut held = self.held.subscribe();
        if held.wait_for(|held| !*held).await.is_err() {
            return Err(FetchError::Aborted);
        }

        let result = match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => self.log.serve(range),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[derive(Debug, Default)]
struct ViewportInner {
    scroll_y: u64,
    max_scroll_y: u64,
    listeners: Vec<ScrollNotifier>,
    bottom_scrolls: usize,
}

impl ViewportInner {
    fn notify(&mut self) {
        self.listeners.retain(ScrollNotifier::notify);
    }
}

/// Scrollable view with a scriptable user
#[derive(Debug, Default)]
pub struct FakeViewport {
    inner: Mutex<ViewportInner>,
}

impl FakeViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content grew: the bottom moves, the view stays put
    pub fn grow(&self, max_scroll_y: u64) {
        self.inner.lock().max_scroll_y = max_scroll_y;
    }

    /// The user scrolls to `y`
    pub fn user_scroll_to(&self, y: u64) {
        let mut inner = self.inner.lock();
        inner.scroll_y = y.min(inner.max_scroll_y);
        inner.notify();
    }

    pub fn scroll_y(&self) -> u64 {
        self.inner.lock().scroll_y
    }

    /// Registered scroll listeners still alive
    pub fn listener_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|l| !l.is_closed());
        inner.listeners.len()
    }

    /// Programmatic scroll-to-bottom calls
    pub fn bottom_scrolls(&self) -> usize {
        self.inner.lock().bottom_scrolls
    }
}

impl Viewport for FakeViewport {
    fn is_at_bottom(&self) -> bool {
        let inner = self.inner.lock();
        inner.scroll_y >= inner.max_scroll_y
    }

    fn scroll_to_bottom(&self) {
        let mut inner = self.inner.lock();
        inner.scroll_y = inner.max_scroll_y;
        inner.bottom_scrolls += 1;
        inner.notify();
    }

    fn subscribe(&self) -> ScrollSubscription {
        let (notifier, subscription) = ScrollSubscription::channel();
        self.inner.lock().listeners.push(notifier);
        subscription
    }
}

/// Numbered lines `from..to` as produced by [`MemoryLog::with_lines`]
pub fn lines_text(from: usize, to: usize) -> String {
    (from..to).map(|i| format!("line {i}\n")).collect()
}
