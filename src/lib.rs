//! Incremental, resumable harvesting of paginated app-store reviews.
//!
//! [`poller::Poller`] drives one crawl per subject against an injected
//! [`feed::FeedSource`] and persists progress through a
//! [`store::SnapshotStore`].
pub mod config;
pub mod feed;
pub mod merge;
pub mod model;
pub mod poller;
pub mod query;
pub mod reducer;
pub mod store;

pub use feed::{FeedSource, FetchError, ItunesFeedClient, RawPage};
pub use model::{CursorState, Review, Snapshot};
pub use poller::{PollError, PollOutcome, Poller};
pub use store::{FileStore, SnapshotStore, StoreError};
