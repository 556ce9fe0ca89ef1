//! Fixed result ordering and pagination.
//!
//! No configurable relevance scoring here: soonest-expiring tenders come
//! first, records with no deadline sort last, and ties break on the
//! record id so two runs over the same set always agree.

use crate::model::CanonicalTenderRecord;
use std::cmp::Ordering;

/// Sort in place: ascending deadline, missing deadlines last.
pub fn rank(records: &mut [CanonicalTenderRecord]) {
    records.sort_by(|a, b| match (a.deadline, b.deadline) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

/// Slice the ranked set into the requested page.
pub fn page(
    records: Vec<CanonicalTenderRecord>,
    offset: usize,
    limit: usize,
) -> Vec<CanonicalTenderRecord> {
    records.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn with_deadline(local: &str, ymd: Option<(i32, u32, u32)>) -> CanonicalTenderRecord {
        let record = CanonicalTenderRecord::new("ted", local, "t");
        match ymd {
            Some((y, m, d)) => {
                record.with_deadline(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
            }
            None => record,
        }
    }

    #[test]
    fn test_soonest_deadline_first_nulls_last() {
        let mut records = vec![
            with_deadline("a", Some((2025, 3, 1))),
            with_deadline("b", None),
            with_deadline("c", Some((2025, 1, 15))),
        ];
        rank(&mut records);

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["ted_c", "ted_a", "ted_b"]);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let build = || {
            vec![
                with_deadline("b", Some((2025, 2, 1))),
                with_deadline("a", Some((2025, 2, 1))),
                with_deadline("d", None),
                with_deadline("c", None),
            ]
        };

        let mut first = build();
        let mut second = build();
        rank(&mut first);
        rank(&mut second);

        let ids_first: Vec<_> = first.iter().map(|r| r.id.clone()).collect();
        let ids_second: Vec<_> = second.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids_first, ids_second);
        // Ties resolved by id
        assert_eq!(ids_first, vec!["ted_a", "ted_b", "ted_c", "ted_d"]);
    }

    #[test]
    fn test_page_slicing() {
        let mut records: Vec<_> = (0u32..10)
            .map(|i| with_deadline(&format!("r{:02}", i), Some((2025, 1, i + 1))))
            .collect();
        rank(&mut records);
        let ranked = records.clone();

        let window = page(records, 3, 4);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].id, ranked[3].id);
        assert_eq!(window[3].id, ranked[6].id);

        // Out-of-range offset yields an empty page
        assert!(page(ranked, 50, 4).is_empty());
    }
}
