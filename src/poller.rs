//! The crawl state machine: resume from the stored cursor, walk pages
//! newest-first, checkpoint after every page that is not the last, then
//! commit the merged review set.
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::feed::{FailureKind, FeedSource, FetchError, RawPage};
use crate::merge::{merge_preferring_fresh, merge_preferring_stored};
use crate::model::{CursorState, Snapshot};
use crate::reducer::{reduce_page, ReviewMap};
use crate::store::{SnapshotStore, StoreError};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetching page {page} for {subject} failed: {source}")]
    Transport {
        subject: String,
        page: u32,
        #[source]
        source: FetchError,
    },
    #[error("cannot load stored snapshot: {0}")]
    CorruptState(#[source] StoreError),
    #[error("cannot persist snapshot: {0}")]
    Write(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New reviews were merged into the stored set.
    Committed { new_reviews: usize },
    /// Nothing new; the stored snapshot was not touched by the final commit.
    Unchanged,
    /// Stopped between pages; the last checkpoint stays authoritative.
    Cancelled,
}

pub struct Poller {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn SnapshotStore>,
    country: String,
    page_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn SnapshotStore>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            store,
            country: country.into(),
            page_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound each page fetch; an elapsed timeout counts as a transport failure.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = Some(timeout);
        self
    }

    /// Checked before every page request.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run one crawl for `subject`. Failures are logged, never returned.
    pub async fn poll(&self, subject: &str) {
        info!(subject, "polling reviews");
        match self.try_poll(subject).await {
            Ok(outcome) => info!(subject, ?outcome, "polling reviews end"),
            Err(err) => error!(subject, error = %err, "error polling reviews"),
        }
    }

    #[instrument(skip_all, fields(subject = %subject))]
    pub async fn try_poll(&self, subject: &str) -> Result<PollOutcome, PollError> {
        let Snapshot { state, data } = self
            .store
            .load(subject)
            .await
            .map_err(PollError::CorruptState)?;

        let prior_completed = state.as_ref().is_some_and(|s| s.is_completed);
        let cutoff = state.as_ref().and_then(|s| s.latest_updated_date.clone());
        let mut page = state.as_ref().and_then(|s| s.page).unwrap_or(0) + 1;

        let mut fetched = ReviewMap::new();
        let mut newest_date: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                warn!(page, "poll cancelled before page request");
                return Ok(PollOutcome::Cancelled);
            }

            let raw = self
                .fetch(subject, page)
                .await
                .map_err(|source| PollError::Transport {
                    subject: subject.to_string(),
                    page,
                    source,
                })?;

            let reduced = reduce_page(&raw.entries, cutoff.as_deref(), &fetched);
            if reduced.new_entries.is_empty() {
                info!(page, "no new reviews");
                break;
            }

            if newest_date.is_none() {
                newest_date = reduced.new_entries.first_dated().map(str::to_owned);
            }
            let stopped_early = reduced.stopped_early();
            let added = reduced.new_entries.len();
            fetched.extend_absent(reduced.new_entries);

            let reached_last = raw.last_page.is_some_and(|last| page >= last);
            if stopped_early || reached_last {
                break;
            }

            page += 1;
            self.store
                .save(
                    subject,
                    &Snapshot::new(CursorState::checkpoint(page), fetched.clone().into_vec()),
                )
                .await
                .map_err(PollError::Write)?;
            info!(page, added, total = fetched.len(), "checkpoint saved");
        }

        if fetched.is_empty() {
            return Ok(PollOutcome::Unchanged);
        }

        let new_reviews = fetched.len();
        let snapshot = if prior_completed {
            Snapshot::new(
                CursorState::completed(newest_date),
                merge_preferring_fresh(fetched, data),
            )
        } else {
            let latest = data.first().and_then(|r| r.date.clone()).or(newest_date);
            Snapshot::new(
                CursorState::completed(latest),
                merge_preferring_stored(data, fetched),
            )
        };

        self.store
            .save(subject, &snapshot)
            .await
            .map_err(PollError::Write)?;
        info!(
            new_reviews,
            stored = snapshot.data.len(),
            "all reviews processed"
        );
        Ok(PollOutcome::Committed { new_reviews })
    }

    async fn fetch(&self, subject: &str, page: u32) -> Result<RawPage, FetchError> {
        let request = self.feed.fetch_page(subject, page, &self.country);
        match self.page_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                FetchError::new(
                    FailureKind::Timeout,
                    format!("no response within {}ms", limit.as_millis()),
                )
            })?,
            None => request.await,
        }
    }
}
