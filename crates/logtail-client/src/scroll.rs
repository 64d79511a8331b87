//! Follow scroll binder
//!
//! Keeps the view pinned to the bottom while following. `stick` is
//! re-derived from the live viewport on every scroll event, never
//! trusted from an earlier reading, since the user can scroll at any
//! time.

use logtail_core::viewport::{ScrollSubscription, Viewport};
use std::future;
use std::sync::Arc;
use tracing::debug;

/// Auto-scroll state for one tail view
pub struct FollowScrollBinder {
    viewport: Arc<dyn Viewport>,
    stick: bool,
    subscription: Option<ScrollSubscription>,
}

impl FollowScrollBinder {
    /// Create a disarmed binder
    #[must_use]
    pub fn new(viewport: Arc<dyn Viewport>) -> Self {
        Self {
            viewport,
            stick: false,
            subscription: None,
        }
    }

    /// Pin to the bottom and start listening for user scrolls
    pub fn arm(&mut self) {
        self.stick = true;
        self.viewport.scroll_to_bottom();
        if self.subscription.is_none() {
            self.subscription = Some(self.viewport.subscribe());
        }
    }

    /// Stop pinning and drop the scroll listener
    pub fn disarm(&mut self) {
        self.stick = false;
        self.subscription = None;
    }

    /// Whether a scroll listener is registered
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether new content should be scrolled into view
    #[inline]
    #[must_use]
    pub fn is_stuck(&self) -> bool {
        self.stick
    }

    /// React to a scroll event
    ///
    /// Returns `false` when the user has left the bottom; the binder is
    /// then disarmed until re-armed.
    pub fn on_scroll(&mut self) -> bool {
        self.stick = self.viewport.is_at_bottom();
        if !self.stick {
            debug!("viewport left the bottom, detaching");
            self.disarm();
        }
        self.stick
    }

    /// Scroll to the new bottom if still pinned
    pub fn settle(&self) {
        if self.stick {
            self.viewport.scroll_to_bottom();
        }
    }

    /// Wait for the next scroll event
    ///
    /// Pending forever while disarmed. `false` means the viewport went
    /// away.
    pub async fn next_scroll(&mut self) -> bool {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.scrolled().await,
            None => future::pending().await,
        }
    }
}

impl std::fmt::Debug for FollowScrollBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowScrollBinder")
            .field("stick", &self.stick)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtail_test_utils::FakeViewport;

    fn binder() -> (Arc<FakeViewport>, FollowScrollBinder) {
        let viewport = Arc::new(FakeViewport::new());
        viewport.grow(1000);
        let binder = FollowScrollBinder::new(viewport.clone());
        (viewport, binder)
    }

    #[test]
    fn arm_scrolls_and_listens() {
        let (viewport, mut binder) = binder();
        assert!(!binder.is_armed());

        binder.arm();
        assert!(binder.is_stuck());
        assert!(binder.is_armed());
        assert_eq!(viewport.scroll_y(), 1000);
        assert_eq!(viewport.listener_count(), 1);

        binder.arm();
        assert_eq!(viewport.listener_count(), 1);
    }

    #[test]
    fn settle_follows_growth_while_stuck() {
        let (viewport, mut binder) = binder();
        binder.arm();
        viewport.grow(1500);
        binder.settle();
        assert_eq!(viewport.scroll_y(), 1500);
    }

    #[test]
    fn scrolling_away_detaches() {
        let (viewport, mut binder) = binder();
        binder.arm();

        viewport.user_scroll_to(200);
        assert!(!binder.on_scroll());
        assert!(!binder.is_stuck());
        assert!(!binder.is_armed());
        assert_eq!(viewport.listener_count(), 0);

        viewport.grow(2000);
        binder.settle();
        assert_eq!(viewport.scroll_y(), 200);
    }

    #[test]
    fn scroll_at_bottom_stays_attached() {
        let (viewport, mut binder) = binder();
        binder.arm();
        viewport.user_scroll_to(1000);
        assert!(binder.on_scroll());
        assert!(binder.is_armed());
    }

    #[tokio::test]
    async fn next_scroll_sees_user_events() {
        let (viewport, mut binder) = binder();
        binder.arm();
        viewport.user_scroll_to(10);
        assert!(binder.next_scroll().await);
        assert!(!binder.on_scroll());
    }
}
