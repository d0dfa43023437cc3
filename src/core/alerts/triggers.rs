// New-item detection against a feed's high-water mark.
//
// These are pure functions: the marks themselves live in the poll state.

use crate::core::model::WatchedList;

/// Largest identifier in the list, 0 for an empty list.
pub fn highest_id(list: &WatchedList) -> u64 {
    list.records().iter().map(|r| r.id).max().unwrap_or(0)
}

/// Number of records whose identifier is strictly above `threshold`.
pub fn count_above(list: &WatchedList, threshold: u64) -> u64 {
    list.records().iter().filter(|r| r.id > threshold).count() as u64
}

/// How many new items to report for a feed whose accounted-for mark is `mark`.
///
/// When the highest identifier moved past the mark this is never less than 1,
/// even if no single record counts as newer (sparse or unparsable ids).
pub fn new_items(list: &WatchedList, mark: u64) -> u64 {
    if highest_id(list) > mark {
        count_above(list, mark).max(1)
    } else {
        0
    }
}
