pub mod category;
pub mod session;
pub mod task;

use std::cmp::Ordering;

/// Storage-assigned row identifier.
pub type RowId = i64;

/// Text order used for sorted lists: case-insensitive, ties broken
/// bytewise. Matches what the hosted database returns for `order=...asc`.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
