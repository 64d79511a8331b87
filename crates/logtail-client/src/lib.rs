//! logtail client - async tailing of remote logs
//!
//! Runtime half of logtail:
//! - [`HttpRangeFetcher`]: reqwest-backed range requests
//! - [`TailController`]: the fetch/merge/poll actor and its [`TailHandle`]
//! - [`FollowScrollBinder`] and [`OffsetQueryBinder`] view bindings
//! - Deployment index retrieval and tracing setup for the `logtail` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use logtail_client::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TailConfig::new().with_follow(true);
//! let fetcher = Arc::new(HttpRangeFetcher::from_config(&config)?);
//! let (handle, task) =
//!     TailController::new("http://cluster:8379/v1/log/global/log.1.txt", fetcher, config).spawn();
//!
//! let mut updates = handle.subscribe();
//! updates.changed().await?;
//! println!("{}", updates.borrow().text());
//!
//! handle.cancel();
//! task.await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod controller;
pub mod fetcher;
pub mod index;
pub mod logging;
pub mod output;
pub mod query;
pub mod scroll;

pub use controller::{TailCommand, TailController, TailHandle};
pub use fetcher::HttpRangeFetcher;
pub use index::{fetch_index, format_record, index_url};
pub use logging::LogFormat;
pub use output::TextCursor;
pub use query::{MemoryQueryStore, OffsetQueryBinder, UrlQueryStore};
pub use scroll::FollowScrollBinder;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a tail
    pub use crate::{HttpRangeFetcher, TailController, TailHandle, TextCursor};
    pub use logtail_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
