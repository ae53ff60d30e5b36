//! Read side: stored reviews for a subject, optionally limited to a recency
//! window.
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::Review;
use crate::store::{SnapshotStore, StoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("reviews not found for subject {0}")]
    NotFound(String),
    #[error("failed to load reviews: {0}")]
    Parse(#[source] StoreError),
    #[error(transparent)]
    Store(StoreError),
}

/// Reviews stored for `subject`. With `hours`, only reviews dated at or after
/// `now - hours` are returned; undated reviews are dropped by the filter.
pub async fn recent_reviews(
    store: &dyn SnapshotStore,
    subject: &str,
    hours: Option<u32>,
    now: DateTime<Utc>,
) -> Result<Vec<Review>, QueryError> {
    let snapshot = match store.read(subject).await {
        Ok(Some(s)) => s,
        Ok(None) => return Err(QueryError::NotFound(subject.to_string())),
        Err(err @ StoreError::Corrupt { .. }) => return Err(QueryError::Parse(err)),
        Err(err) => return Err(QueryError::Store(err)),
    };

    let Some(hours) = hours else {
        return Ok(snapshot.data);
    };
    let cutoff = now - Duration::hours(i64::from(hours));
    Ok(snapshot
        .data
        .into_iter()
        .filter(|r| {
            r.date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .is_some_and(|d| d.with_timezone(&Utc) >= cutoff)
        })
        .collect())
}
