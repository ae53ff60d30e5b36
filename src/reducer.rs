//! Page reduction: turns one fetched page into the reviews that are new for
//! the current run, and tells the poller whether the crawl has caught up.
use chrono::DateTime;
use std::collections::HashMap;

use crate::model::Review;

/// Insertion-ordered map of reviews keyed by id.
///
/// The first insertion of an id wins; later inserts of the same id are ignored.
/// Iteration follows insertion order, which for feed data means newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewMap {
    order: Vec<Review>,
    index: HashMap<String, usize>,
}

impl ReviewMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the review was inserted.
    pub fn insert_if_absent(&mut self, review: Review) -> bool {
        if self.index.contains_key(&review.id) {
            return false;
        }
        self.index.insert(review.id.clone(), self.order.len());
        self.order.push(review);
        true
    }

    /// Appends every entry of `other` whose id is not yet present.
    pub fn extend_absent<I: IntoIterator<Item = Review>>(&mut self, other: I) {
        for review in other {
            self.insert_if_absent(review);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Review> {
        self.index.get(id).map(|&i| &self.order[i])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Review> {
        self.order.iter()
    }

    pub fn first_dated(&self) -> Option<&str> {
        self.order.iter().find_map(|r| r.date.as_deref())
    }

    pub fn into_vec(self) -> Vec<Review> {
        self.order
    }
}

impl FromIterator<Review> for ReviewMap {
    fn from_iter<I: IntoIterator<Item = Review>>(iter: I) -> Self {
        let mut map = ReviewMap::new();
        map.extend_absent(iter);
        map
    }
}

impl IntoIterator for ReviewMap {
    type Item = Review;
    type IntoIter = std::vec::IntoIter<Review>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// Every entry on the page was examined.
    Exhausted,
    /// An entry at or before the cursor date was reached.
    CaughtUp,
    /// The page had no entries at all.
    NoMoreData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedPage {
    pub new_entries: ReviewMap,
    pub end: PageEnd,
}

impl ReducedPage {
    /// The crawl has nothing further to find past this page.
    pub fn stopped_early(&self) -> bool {
        matches!(self.end, PageEnd::CaughtUp | PageEnd::NoMoreData)
    }
}

/// `true` when `date` is at or before `cutoff`. Missing or unparseable dates
/// never count as caught up.
pub fn is_at_or_before(date: Option<&str>, cutoff: &str) -> bool {
    let Some(date) = date else {
        return false;
    };
    match (
        DateTime::parse_from_rfc3339(date),
        DateTime::parse_from_rfc3339(cutoff),
    ) {
        (Ok(d), Ok(c)) => d <= c,
        _ => false,
    }
}

/// Reduce a newest-first page against the cursor date and the ids already
/// collected earlier in this run.
pub fn reduce_page(
    entries: &[Review],
    last_updated_date: Option<&str>,
    already_seen: &ReviewMap,
) -> ReducedPage {
    if entries.is_empty() {
        return ReducedPage {
            new_entries: ReviewMap::new(),
            end: PageEnd::NoMoreData,
        };
    }

    let mut new_entries = ReviewMap::new();
    for entry in entries {
        if let Some(cutoff) = last_updated_date {
            if is_at_or_before(entry.date.as_deref(), cutoff) {
                return ReducedPage {
                    new_entries,
                    end: PageEnd::CaughtUp,
                };
            }
        }
        if !already_seen.contains(&entry.id) {
            new_entries.insert_if_absent(entry.clone());
        }
    }

    ReducedPage {
        new_entries,
        end: PageEnd::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, date: &str) -> Review {
        Review {
            id: id.into(),
            date: Some(date.into()),
            ..Default::default()
        }
    }

    #[test]
    fn review_map_first_occurrence_wins() {
        let mut map = ReviewMap::new();
        assert!(map.insert_if_absent(Review {
            id: "a".into(),
            title: "first".into(),
            ..Default::default()
        }));
        assert!(!map.insert_if_absent(Review {
            id: "a".into(),
            title: "second".into(),
            ..Default::default()
        }));
        map.insert_if_absent(review("b", "2025-01-01T00:00:00Z"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").unwrap().title, "first");
        let ids: Vec<_> = map.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn empty_page_is_no_more_data() {
        let reduced = reduce_page(&[], None, &ReviewMap::new());
        assert_eq!(reduced.end, PageEnd::NoMoreData);
        assert!(reduced.stopped_early());
        assert!(reduced.new_entries.is_empty());
    }

    #[test]
    fn without_cursor_every_unseen_entry_is_new() {
        let page = vec![
            review("3", "2025-01-03T00:00:00Z"),
            review("2", "2025-01-02T00:00:00Z"),
        ];
        let reduced = reduce_page(&page, None, &ReviewMap::new());
        assert_eq!(reduced.end, PageEnd::Exhausted);
        assert!(!reduced.stopped_early());
        assert_eq!(reduced.new_entries.len(), 2);
    }

    #[test]
    fn stops_at_entry_equal_to_cursor_and_excludes_it() {
        let page = vec![
            review("3", "2025-01-03T00:00:00Z"),
            review("2", "2025-01-02T00:00:00Z"),
            review("1", "2025-01-01T00:00:00Z"),
        ];
        let reduced = reduce_page(&page, Some("2025-01-02T00:00:00Z"), &ReviewMap::new());
        assert_eq!(reduced.end, PageEnd::CaughtUp);
        let ids: Vec<_> = reduced.new_entries.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn cutoff_compares_instants_across_offsets() {
        // 01:00-07:00 is 08:00Z, later than 07:00Z.
        assert!(!is_at_or_before(
            Some("2025-01-01T01:00:00-07:00"),
            "2025-01-01T07:00:00Z"
        ));
        assert!(is_at_or_before(
            Some("2025-01-01T00:00:00-07:00"),
            "2025-01-01T07:00:00Z"
        ));
        assert!(!is_at_or_before(None, "2025-01-01T07:00:00Z"));
        assert!(!is_at_or_before(Some("garbage"), "2025-01-01T07:00:00Z"));
    }

    #[test]
    fn entries_seen_earlier_in_run_are_dropped() {
        let seen: ReviewMap = vec![review("2", "2025-01-02T00:00:00Z")].into_iter().collect();
        let page = vec![
            review("2", "2025-01-02T00:00:00Z"),
            review("1", "2025-01-01T00:00:00Z"),
        ];
        let reduced = reduce_page(&page, None, &seen);
        let ids: Vec<_> = reduced.new_entries.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }
}
