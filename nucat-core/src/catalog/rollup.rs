//! Rolling an event stream up to the latest event per package version
//!
//! The catalog is an append-only log, so the current state of a package
//! version is simply its most recent event. Sorting newest first and keeping
//! the first entry seen for each id/version yields that state.

use std::collections::HashSet;

use super::entry::{CatalogEntry, EntryKey};

/// Incremental first-seen-wins deduplication
///
/// Entries must be inserted newest first; [`rollup`] takes care of that for
/// unordered input.
#[derive(Debug, Default)]
pub struct Rollup {
    seen: HashSet<EntryKey>,
    entries: Vec<CatalogEntry>,
}

impl Rollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `entry` unless its id/version was already seen
    ///
    /// Returns whether the entry was kept.
    pub fn insert(&mut self, entry: CatalogEntry) -> bool {
        if self.seen.insert(entry.key()) {
            self.entries.push(entry);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kept entries in insertion order
    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }
}

impl Extend<CatalogEntry> for Rollup {
    fn extend<I: IntoIterator<Item = CatalogEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// Sort newest commit first; ties keep their relative order
pub fn sort_commit_time_desc(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| b.commit_timestamp().cmp(&a.commit_timestamp()));
}

/// Collapse entries to the latest one per id/version, newest first
pub fn rollup(entries: impl IntoIterator<Item = CatalogEntry>) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = entries.into_iter().collect();
    sort_commit_time_desc(&mut entries);

    let mut rollup = Rollup::new();
    rollup.extend(entries);
    rollup.into_entries()
}
