//! Scroll viewport seam
//!
//! The render layer owns the scrollable view. The follow binder only
//! queries the live position, scrolls to the bottom, and listens for
//! scroll events through an explicit [`ScrollSubscription`].

use tokio::sync::mpsc;

/// Scrollable view showing the tailed text
pub trait Viewport: Send + Sync {
    /// Whether the view is currently scrolled to the bottom
    fn is_at_bottom(&self) -> bool;

    /// Scroll to the bottom of the content
    fn scroll_to_bottom(&self);

    /// Register for scroll events; dropping the subscription unregisters
    fn subscribe(&self) -> ScrollSubscription;
}

/// Receiving end of a scroll listener registration
#[derive(Debug)]
pub struct ScrollSubscription {
    events: mpsc::UnboundedReceiver<()>,
}

/// Sending end held by the viewport
#[derive(Debug, Clone)]
pub struct ScrollNotifier {
    tx: mpsc::UnboundedSender<()>,
}

impl ScrollSubscription {
    /// Create a linked notifier/subscription pair
    #[must_use]
    pub fn channel() -> (ScrollNotifier, ScrollSubscription) {
        let (tx, events) = mpsc::unbounded_channel();
        (ScrollNotifier { tx }, ScrollSubscription { events })
    }

    /// Wait for the next scroll event
    ///
    /// Several events queued since the last call collapse into one.
    /// Returns `false` once the viewport side is gone.
    pub async fn scrolled(&mut self) -> bool {
        if self.events.recv().await.is_none() {
            return false;
        }
        while self.events.try_recv().is_ok() {}
        true
    }
}

impl ScrollNotifier {
    /// Deliver a scroll event; `false` if the listener unsubscribed
    #[inline]
    pub fn notify(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Whether the listener unsubscribed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
