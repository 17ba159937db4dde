use crate::cli::SortMode;

use super::types::EntryMeta;

/// Apply the ordering policy to one directory's entries.
///
/// `SortMode::None` keeps the listing order. `dirs_first` is a stable
/// partition on top of whatever order the sort produced.
pub fn order_entries(entries: &mut [EntryMeta], sort: SortMode, dirs_first: bool) {
    if matches!(sort, SortMode::Name) {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
    }
    if dirs_first {
        entries.sort_by_key(|e| !e.points_to_directory());
    }
}
