use std::collections::HashSet;

use crate::models::Listing;

/// Result of partitioning a candidate batch against the store.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Listings not seen before, in input order.
    pub new: Vec<Listing>,
    pub duplicate_count: usize,
}

/// Partition `candidates` into new listings and duplicates.
///
/// A candidate is a duplicate when its `image_url` is already in `known_keys`
/// or appeared earlier in the same batch (first occurrence wins). Candidates
/// without an `image_url` cannot be matched and are always new.
pub fn filter_duplicates(candidates: Vec<Listing>, known_keys: &HashSet<String>) -> DedupOutcome {
    let mut seen_in_batch: HashSet<String> = HashSet::new();
    let mut outcome = DedupOutcome::default();

    for listing in candidates {
        match listing.image_url.as_deref() {
            Some(key) if known_keys.contains(key) || seen_in_batch.contains(key) => {
                outcome.duplicate_count += 1;
            }
            Some(key) => {
                seen_in_batch.insert(key.to_string());
                outcome.new.push(listing);
            }
            None => outcome.new.push(listing),
        }
    }

    outcome
}
