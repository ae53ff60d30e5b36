use serde::{Deserialize, Serialize};

/// A single review harvested from the feed, keyed by `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub rating: Option<u8>,
    pub date: Option<String>,
}

/// Per-subject crawl progress.
///
/// `page` is set only while a crawl is incomplete; the next run starts at
/// `page + 1`. `latest_updated_date` is only meaningful once
/// `is_completed` is true.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub latest_updated_date: Option<String>,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl CursorState {
    pub fn checkpoint(page: u32) -> Self {
        Self {
            latest_updated_date: None,
            is_completed: false,
            page: Some(page),
        }
    }

    pub fn completed(latest_updated_date: Option<String>) -> Self {
        Self {
            latest_updated_date,
            is_completed: true,
            page: None,
        }
    }
}

/// The persisted unit for one subject. `state` is `None` before the first crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub state: Option<CursorState>,
    pub data: Vec<Review>,
}

impl Snapshot {
    pub fn new(state: CursorState, data: Vec<Review>) -> Self {
        Self {
            state: Some(state),
            data,
        }
    }
}
