//! Cross-source duplicate merging.
//!
//! The same tender is routinely published on several sources with small
//! wording differences. Records are keyed by a normalized title prefix
//! plus a buyer-name prefix; records sharing a key are treated as the
//! same underlying tender and the more informative one is kept.
//!
//! This is a stated approximation, not an exact match: similar titles
//! from the same buyer can over-merge, and reworded cross-posts can slip
//! through. Callers needing higher precision would swap in a stricter
//! similarity function here.

use crate::model::CanonicalTenderRecord;
use crate::utils::truncate_chars;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Normalized-title prefix length used in the composite key.
pub const TITLE_KEY_LEN: usize = 40;

/// Buyer-name prefix length used in the composite key.
pub const BUYER_KEY_LEN: usize = 20;

/// Composite identity key: lower-cased title stripped of everything
/// non-alphanumeric, truncated, plus the lower-cased buyer prefix.
pub fn composite_key(record: &CanonicalTenderRecord) -> String {
    let title: String = record
        .title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let buyer = record.buyer.to_lowercase();

    format!(
        "{}|{}",
        truncate_chars(&title, TITLE_KEY_LEN),
        truncate_chars(&buyer, BUYER_KEY_LEN)
    )
}

/// Precedence for collisions: a record with an estimated value beats one
/// without; otherwise the longer description wins.
fn more_informative(candidate: &CanonicalTenderRecord, kept: &CanonicalTenderRecord) -> bool {
    match (candidate.value.is_some(), kept.value.is_some()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.description.len() > kept.description.len(),
    }
}

/// Merge records that share a composite key, preserving first-seen key
/// order. Idempotent: running it on its own output changes nothing.
pub fn deduplicate(records: Vec<CanonicalTenderRecord>) -> Vec<CanonicalTenderRecord> {
    let mut order: Vec<String> = Vec::with_capacity(records.len());
    let mut by_key: HashMap<String, CanonicalTenderRecord> = HashMap::with_capacity(records.len());

    for record in records {
        let key = composite_key(&record);
        match by_key.entry(key) {
            Entry::Occupied(mut entry) => {
                if more_informative(&record, entry.get()) {
                    entry.insert(record);
                }
            }
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(record);
            }
        }
    }

    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, local: &str, title: &str, buyer: &str) -> CanonicalTenderRecord {
        CanonicalTenderRecord::new(source, local, title).with_buyer(buyer)
    }

    #[test]
    fn test_composite_key_normalization() {
        let a = record("ted", "1", "Road Maintenance - Lot 2!", "City of Lyon");
        let b = record("boamp", "9", "road maintenance   lot 2", "CITY OF LYON");
        assert_eq!(composite_key(&a), composite_key(&b));

        let c = record("ted", "2", "Road resurfacing", "City of Lyon");
        assert_ne!(composite_key(&a), composite_key(&c));
    }

    #[test]
    fn test_merge_keeps_value_bearing_record() {
        let plain = record("ted", "1", "School canteen catering", "Ville de Nantes");
        let valued = record("boamp", "2", "School Canteen Catering", "ville de nantes")
            .with_value(250_000.0, "EUR");

        let merged = deduplicate(vec![plain, valued]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "boamp");
        assert_eq!(merged[0].value, Some(250_000.0));
    }

    #[test]
    fn test_merge_falls_back_to_longer_description() {
        let short = record("ted", "1", "IT support services", "Stadt Berlin")
            .with_description("Support.");
        let long = record("contracts_finder", "2", "IT Support Services", "stadt berlin")
            .with_description("Second-line IT support for municipal offices.");

        let merged = deduplicate(vec![short, long]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "contracts_finder");
    }

    #[test]
    fn test_distinct_records_survive() {
        let a = record("ted", "1", "Bridge renovation", "City A");
        let b = record("ted", "2", "Bridge renovation", "City B");
        let c = record("ted", "3", "Harbour dredging", "City A");

        let merged = deduplicate(vec![a, b, c]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_idempotence() {
        let records = vec![
            record("ted", "1", "Waste collection", "Comune di Roma").with_value(1.0, "EUR"),
            record("boamp", "2", "Waste Collection!", "comune di roma"),
            record("ted", "3", "Street lighting", "Comune di Roma"),
        ];

        let once = deduplicate(records);
        let twice = deduplicate(once.clone());

        let ids_once: Vec<_> = once.iter().map(|r| r.id.clone()).collect();
        let ids_twice: Vec<_> = twice.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids_once, ids_twice);
    }
}
