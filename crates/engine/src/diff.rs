//! Diff engine: turns "the playlist changed" into "these items are new".

use chrono::{DateTime, Utc};

use tunewatch_common::types::PlaylistItem;

/// Return the items added strictly after `watermark`, oldest first.
///
/// The fetch order is not trusted, so items are sorted by `added_at` first.
/// The sort is stable: items sharing a timestamp keep their fetch order, so the
/// same input always yields the same output. With no watermark every item is
/// new.
pub fn diff(mut items: Vec<PlaylistItem>, watermark: Option<DateTime<Utc>>) -> Vec<PlaylistItem> {
    items.sort_by_key(|item| item.added_at);

    match watermark {
        None => items,
        Some(mark) => {
            let first_new = items.partition_point(|item| item.added_at <= mark);
            items.split_off(first_new)
        }
    }
}

/// The `added_at` of the newest item, if any.
pub fn latest_added_at(items: &[PlaylistItem]) -> Option<DateTime<Utc>> {
    items.iter().map(|item| item.added_at).max()
}
