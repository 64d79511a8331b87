//! Tail controller
//!
//! Owns one tailed log: the current [`TailState`], the single in-flight
//! range fetch, the poll timer, the scroll-settle timer and the optional
//! view binders. Every transition replaces the state snapshot and
//! publishes it to observers.
//!
//! The controller runs as an actor ([`TailController::spawn`]) driven by
//! commands from a [`TailHandle`], or can be stepped directly.
//!
//! Invariants:
//! - at most one fetch in flight and one poll timer pending
//! - a directive issued during a fetch is queued for the next one
//! - dropping the in-flight future aborts the request; its result can
//!   no longer reach the state

use crate::query::OffsetQueryBinder;
use crate::scroll::FollowScrollBinder;
use futures::future::BoxFuture;
use logtail_core::error::FetchError;
use logtail_core::{
    merge, next_range, Chunk, Directive, LastError, QueryStore, RangeFetcher, RangeRequest,
    TailConfig, TailState, Viewport,
};
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info, warn};

/// Commands accepted by a running controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailCommand {
    /// Enable or disable follow mode
    Follow(bool),
    /// Extend the buffer backwards by one chunk
    LoadPrevious,
    /// Jump to the live end and follow
    SkipToEnd,
    /// Read from an absolute offset
    JumpTo(u64),
    /// Tear down
    Cancel,
}

type FetchFuture = BoxFuture<'static, Result<Chunk, FetchError>>;
type Timer = Option<Pin<Box<Sleep>>>;

struct InFlight {
    range: RangeRequest,
    started: Instant,
    fut: FetchFuture,
}

enum Event {
    Command(Option<TailCommand>),
    Fetched {
        range: RangeRequest,
        latency: Duration,
        result: Result<Chunk, FetchError>,
    },
    Poll,
    Settle,
    Scrolled(bool),
}

/// Incremental tail of one log URL
pub struct TailController {
    config: TailConfig,
    url: Arc<str>,
    fetcher: Arc<dyn RangeFetcher>,
    state: Arc<TailState>,
    pending: Option<Directive>,
    in_flight: Option<InFlight>,
    poll_timer: Timer,
    scroll_timer: Timer,
    scroll: Option<FollowScrollBinder>,
    query: Option<OffsetQueryBinder>,
    observers: watch::Sender<Arc<TailState>>,
}

impl TailController {
    /// Create controller for `url`; nothing is fetched until started
    #[must_use]
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn RangeFetcher>, config: TailConfig) -> Self {
        let state = Arc::new(TailState::new().with_follow(config.follow));
        let (observers, _) = watch::channel(Arc::clone(&state));
        Self {
            config,
            url: Arc::from(url.into()),
            fetcher,
            state,
            pending: None,
            in_flight: None,
            poll_timer: None,
            scroll_timer: None,
            scroll: None,
            query: None,
            observers,
        }
    }

    /// Pin `viewport` to the bottom while following
    #[must_use]
    pub fn with_viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.scroll = Some(FollowScrollBinder::new(viewport));
        self
    }

    /// Mirror the read offset into `store`; a stored offset seeds the
    /// first fetch
    #[must_use]
    pub fn with_query(mut self, store: Arc<dyn QueryStore>) -> Self {
        let binder = OffsetQueryBinder::new(store, self.config.offset_param.clone());
        if let Some(offset) = binder.initial_offset() {
            debug!(offset, "resuming from query offset");
            self.pending = Some(Directive::Jump(offset));
        }
        self.query = Some(binder);
        self
    }

    /// Start reading at `offset` instead of the end of the file
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.pending = Some(Directive::Jump(offset));
        self
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn state(&self) -> Arc<TailState> {
        Arc::clone(&self.state)
    }

    /// Receive every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<TailState>> {
        self.observers.subscribe()
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Whether a fetch is in flight
    #[inline]
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Range of the in-flight fetch
    #[inline]
    #[must_use]
    pub fn in_flight_range(&self) -> Option<RangeRequest> {
        self.in_flight.as_ref().map(|f| f.range)
    }

    /// Directive queued for the next fetch
    #[inline]
    #[must_use]
    pub fn pending(&self) -> Option<Directive> {
        self.pending
    }

    /// Whether a poll or scroll-settle timer is armed
    #[inline]
    #[must_use]
    pub fn has_pending_timers(&self) -> bool {
        self.poll_timer.is_some() || self.scroll_timer.is_some()
    }

    /// Whether the poll timer is armed
    #[inline]
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll_timer.is_some()
    }

    /// Whether the view is pinned to the bottom
    #[inline]
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.scroll.as_ref().is_some_and(FollowScrollBinder::is_stuck)
    }

    fn replace(&mut self, next: TailState) {
        self.state = Arc::new(next);
        self.observers.send_replace(Arc::clone(&self.state));
    }

    /// Begin tailing: pin the view if following, then fetch
    pub fn open(&mut self) {
        if self.state.follow {
            if let Some(binder) = &mut self.scroll {
                binder.arm();
            }
        }
        self.start();
    }

    /// Fetch the next range unless a fetch is already in flight
    ///
    /// Consumes the pending directive. Clears the poll timer, which is
    /// re-armed when the fetch completes.
    pub fn start(&mut self) {
        self.poll_timer = None;
        if self.in_flight.is_some() {
            return;
        }

        let range = next_range(&self.state, self.pending.take(), self.config.chunk_size);
        debug!(url = %self.url, %range, "fetching");

        let fetcher = Arc::clone(&self.fetcher);
        let url = Arc::clone(&self.url);
        self.in_flight = Some(InFlight {
            range,
            started: Instant::now(),
            fut: Box::pin(async move { fetcher.fetch(&url, range).await }),
        });
    }

    fn complete(&mut self, range: RangeRequest, latency: Duration, result: Result<Chunk, FetchError>) {
        if self.state.follow {
            self.poll_timer = Some(Box::pin(sleep(self.config.poll_interval())));
        }

        match result {
            Ok(chunk) => {
                debug!(
                    url = %self.url,
                    offset = chunk.offset,
                    len = chunk.len(),
                    total = chunk.total,
                    ?latency,
                    "chunk received"
                );
                let next = merge(&self.state, &chunk);
                self.replace(next);
                if let Some(query) = &self.query {
                    query.record(&self.state);
                }
                if self.is_pinned() && self.scroll_timer.is_none() {
                    self.scroll_timer = Some(Box::pin(sleep(self.config.scroll_settle())));
                }
            }
            Err(FetchError::EmptyFile { total }) => {
                info!(url = %self.url, total, "log is empty");
                let next = self.state.emptied(total);
                self.replace(next);
            }
            Err(err) => {
                warn!(url = %self.url, %range, error = %err, "fetch failed");
                let next = self.state.with_error(LastError::new(&err, range, latency));
                self.replace(next);
            }
        }

        if self.pending.is_some() {
            self.start();
        }
    }

    /// Enable or disable follow mode
    ///
    /// Enabling with a buffer jumps to the live end; without one the next
    /// fetch reads the trailing window (or a queued jump). Disabling
    /// stops polling and keeps the buffer.
    pub fn set_follow(&mut self, enabled: bool) {
        if enabled == self.state.follow {
            return;
        }
        info!(url = %self.url, enabled, "follow");
        let next = self.state.with_follow(enabled);
        self.replace(next);

        if enabled {
            if self.state.is_loaded() {
                self.pending = Some(Directive::skip_to_end(self.state.total, self.config.chunk_size));
            }
            if let Some(binder) = &mut self.scroll {
                binder.arm();
            }
            self.start();
        } else {
            self.disengage();
        }
    }

    fn disengage(&mut self) {
        self.poll_timer = None;
        self.scroll_timer = None;
        if let Some(binder) = &mut self.scroll {
            binder.disarm();
        }
    }

    /// Extend the buffer backwards by one chunk
    ///
    /// No-op while nothing is buffered or the buffer starts at byte 0.
    pub fn load_previous(&mut self) {
        match Directive::load_previous(&self.state, self.config.chunk_size) {
            Some(directive) => {
                debug!(url = %self.url, offset = directive.offset(), "loading previous chunk");
                self.pending = Some(directive);
                self.start();
            }
            None => debug!(url = %self.url, "nothing before the buffer"),
        }
    }

    /// Jump to the live end of the file and follow it
    pub fn skip_to_end(&mut self) {
        info!(url = %self.url, total = self.state.total, "skip to end");
        self.pending = self
            .state
            .is_loaded()
            .then(|| Directive::skip_to_end(self.state.total, self.config.chunk_size));
        if !self.state.follow {
            let next = self.state.with_follow(true);
            self.replace(next);
        }
        if let Some(binder) = &mut self.scroll {
            binder.arm();
        }
        self.start();
    }

    /// Read from `offset` on the next fetch
    pub fn jump_to(&mut self, offset: u64) {
        debug!(url = %self.url, offset, "jump");
        self.pending = Some(Directive::Jump(offset));
        self.start();
    }

    /// Tear down: abort the fetch, clear both timers, drop the scroll
    /// listener and the offset parameter. Idempotent.
    pub fn cancel(&mut self) {
        if self.in_flight.take().is_some() {
            debug!(url = %self.url, "aborted in-flight fetch");
        }
        self.pending = None;
        self.disengage();
        if let Some(query) = &self.query {
            query.clear();
        }
    }

    fn user_scrolled(&mut self, alive: bool) {
        let Some(binder) = &mut self.scroll else {
            return;
        };
        if !alive {
            debug!(url = %self.url, "viewport closed");
            binder.disarm();
            return;
        }
        if !binder.on_scroll() && self.state.follow {
            info!(url = %self.url, "scrolled away from the bottom, follow disengaged");
            let next = self.state.with_follow(false);
            self.replace(next);
            self.disengage();
        }
    }

    fn is_idle(&self) -> bool {
        self.in_flight.is_none()
            && !self.has_pending_timers()
            && !self.scroll.as_ref().is_some_and(FollowScrollBinder::is_armed)
    }

    async fn next_event(
        &mut self,
        commands: &mut Option<mpsc::UnboundedReceiver<TailCommand>>,
    ) -> Option<Event> {
        if commands.is_none() && self.is_idle() {
            return None;
        }
        let event = tokio::select! {
            command = wait_command(commands) => Event::Command(command),
            (range, latency, result) = wait_fetch(&mut self.in_flight) => Event::Fetched { range, latency, result },
            () = wait_timer(&mut self.poll_timer) => Event::Poll,
            () = wait_timer(&mut self.scroll_timer) => Event::Settle,
            alive = wait_scroll(&mut self.scroll) => Event::Scrolled(alive),
        };
        Some(event)
    }

    /// Returns `false` once the controller should stop
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Command(Some(command)) => return self.apply(command),
            Event::Command(None) => {
                debug!(url = %self.url, "all handles dropped");
                return false;
            }
            Event::Fetched {
                range,
                latency,
                result,
            } => self.complete(range, latency, result),
            Event::Poll => self.start(),
            Event::Settle => {
                if let Some(binder) = &self.scroll {
                    binder.settle();
                }
            }
            Event::Scrolled(alive) => self.user_scrolled(alive),
        }
        true
    }

    /// Apply one command; `false` after a cancel
    pub fn apply(&mut self, command: TailCommand) -> bool {
        match command {
            TailCommand::Follow(enabled) => self.set_follow(enabled),
            TailCommand::LoadPrevious => self.load_previous(),
            TailCommand::SkipToEnd => self.skip_to_end(),
            TailCommand::JumpTo(offset) => self.jump_to(offset),
            TailCommand::Cancel => {
                self.cancel();
                return false;
            }
        }
        true
    }

    /// Process the next fetch completion, timer or scroll event
    ///
    /// Returns `false` when there is nothing left to wait for.
    pub async fn step(&mut self) -> bool {
        let mut no_commands = None;
        match self.next_event(&mut no_commands).await {
            Some(event) => self.handle(event),
            None => false,
        }
    }

    /// Run until cancelled or every command sender is dropped
    pub async fn run(mut self, commands: mpsc::UnboundedReceiver<TailCommand>) {
        let mut commands = Some(commands);
        self.open();
        while let Some(event) = self.next_event(&mut commands).await {
            if !self.handle(event) {
                break;
            }
        }
        self.cancel();
        debug!(url = %self.url, "tail controller stopped");
    }

    /// Run on a tokio task
    #[must_use]
    pub fn spawn(self) -> (TailHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TailHandle {
            commands: tx,
            state: self.subscribe(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }
}

impl std::fmt::Debug for TailController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailController")
            .field("url", &self.url)
            .field("span", &self.state.span())
            .field("follow", &self.state.follow)
            .field("pending", &self.pending)
            .field("in_flight", &self.in_flight_range())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

async fn wait_command(
    commands: &mut Option<mpsc::UnboundedReceiver<TailCommand>>,
) -> Option<TailCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn wait_fetch(
    slot: &mut Option<InFlight>,
) -> (RangeRequest, Duration, Result<Chunk, FetchError>) {
    let Some(in_flight) = slot.as_mut() else {
        return future::pending().await;
    };
    let result = in_flight.fut.as_mut().await;
    let done = (in_flight.range, in_flight.started.elapsed(), result);
    *slot = None;
    done
}

async fn wait_timer(slot: &mut Timer) {
    let Some(timer) = slot.as_mut() else {
        return future::pending().await;
    };
    timer.as_mut().await;
    *slot = None;
}

async fn wait_scroll(binder: &mut Option<FollowScrollBinder>) -> bool {
    match binder {
        Some(binder) => binder.next_scroll().await,
        None => future::pending().await,
    }
}

/// Cloneable handle to a spawned controller
///
/// Commands sent after the controller stopped are ignored.
#[derive(Debug, Clone)]
pub struct TailHandle {
    commands: mpsc::UnboundedSender<TailCommand>,
    state: watch::Receiver<Arc<TailState>>,
}

impl TailHandle {
    fn send(&self, command: TailCommand) {
        if self.commands.send(command).is_err() {
            debug!(?command, "tail controller already stopped");
        }
    }

    /// Enable or disable follow mode
    pub fn set_follow(&self, enabled: bool) {
        self.send(TailCommand::Follow(enabled));
    }

    /// Extend the buffer backwards by one chunk
    pub fn load_previous(&self) {
        self.send(TailCommand::LoadPrevious);
    }

    /// Jump to the live end and follow
    pub fn skip_to_end(&self) {
        self.send(TailCommand::SkipToEnd);
    }

    /// Read from `offset`
    pub fn jump_to(&self, offset: u64) {
        self.send(TailCommand::JumpTo(offset));
    }

    /// Stop the controller
    pub fn cancel(&self) {
        self.send(TailCommand::Cancel);
    }

    /// Whether the controller has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Receive every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<TailState>> {
        self.state.clone()
    }

    /// Latest snapshot
    #[must_use]
    pub fn state(&self) -> Arc<TailState> {
        Arc::clone(&self.state.borrow())
    }
}
