//! Commit-time merges of freshly fetched reviews with the stored set.
//!
//! Both produce one review per id. They differ only in which side wins when
//! an id appears on both, and which side comes first in the output.
use crate::model::Review;
use crate::reducer::ReviewMap;

/// Fresh reviews first; stored reviews only fill in ids the fresh set lacks.
///
/// Used when topping up history that was already complete.
pub fn merge_preferring_fresh(fresh: ReviewMap, stored: Vec<Review>) -> Vec<Review> {
    let mut merged = fresh;
    merged.extend_absent(stored);
    merged.into_vec()
}

/// Stored reviews first; fresh reviews only fill in ids the stored set lacks.
///
/// Used when finishing a crawl that was left incomplete.
pub fn merge_preferring_stored(stored: Vec<Review>, fresh: ReviewMap) -> Vec<Review> {
    let mut merged: ReviewMap = stored.into_iter().collect();
    merged.extend_absent(fresh);
    merged.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, title: &str) -> Review {
        Review {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    fn conflicting() -> (ReviewMap, Vec<Review>) {
        let fresh: ReviewMap = vec![review("new", "fresh-only"), review("x", "fresh")]
            .into_iter()
            .collect();
        let stored = vec![review("x", "stored"), review("old", "stored-only")];
        (fresh, stored)
    }

    #[test]
    fn preferring_fresh_keeps_fresh_duplicate() {
        let (fresh, stored) = conflicting();
        let merged = merge_preferring_fresh(fresh, stored);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "x", "old"]);
        assert_eq!(merged[1].title, "fresh");
    }

    #[test]
    fn preferring_stored_keeps_stored_duplicate() {
        let (fresh, stored) = conflicting();
        let merged = merge_preferring_stored(stored, fresh);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "old", "new"]);
        assert_eq!(merged[0].title, "stored");
    }

    #[test]
    fn duplicate_ids_inside_stored_collapse() {
        let stored = vec![review("x", "a"), review("x", "b")];
        let merged = merge_preferring_stored(stored, ReviewMap::new());
        assert_eq!(merged, vec![review("x", "a")]);
    }
}
