//! Time windows and page selection
//!
//! A window is `(start, end]`: commits exactly at `start` belong to the
//! previous window, commits exactly at `end` belong to this one. That makes
//! a cursor-driven crawl lossless: the end of one read is the start of the
//! next.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use super::index::PageRef;
use crate::error::{CatalogError, Result};

/// Half-open commit time range, start exclusive and end inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window; `start == end` is allowed and selects nothing
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(CatalogError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Everything committed up to now
    pub fn full_history() -> Self {
        Self::until(Utc::now())
    }

    /// Everything committed up to and including `end`
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end,
        }
    }

    /// Everything committed after `start` and up to now
    ///
    /// Pass the previous read's end as `start` to continue a crawl.
    pub fn since(start: DateTime<Utc>) -> Result<Self> {
        Self::new(start, Utc::now())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `timestamp` falls in `(start, end]`
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp > self.start && timestamp <= self.end
    }

    /// Split at `at`, yielding `(start, at]` and `(at, end]`
    pub fn split_at(&self, at: DateTime<Utc>) -> Result<(Self, Self)> {
        Ok((Self::new(self.start, at)?, Self::new(at, self.end)?))
    }
}

/// Pick the pages that may hold entries committed inside `window`
///
/// A page's timestamp only summarizes it, so entries inside the window can
/// live on the nearest page before or after it. Those two boundary pages are
/// added to every page whose timestamp is in range. The result is ordered
/// by page timestamp with duplicate uris removed.
pub fn select_pages(pages: &[PageRef], window: &TimeWindow) -> Vec<PageRef> {
    if pages.is_empty() || window.is_empty() {
        return Vec::new();
    }

    let before = pages
        .iter()
        .filter(|p| p.commit_timestamp <= window.start())
        .max_by_key(|p| p.commit_timestamp);

    let after = pages
        .iter()
        .filter(|p| p.commit_timestamp > window.end())
        .min_by_key(|p| p.commit_timestamp);

    let in_range = pages
        .iter()
        .filter(|p| window.contains(p.commit_timestamp));

    let mut selected: Vec<PageRef> = before
        .into_iter()
        .chain(in_range)
        .chain(after)
        .cloned()
        .collect();
    selected.sort_by_key(|p| p.commit_timestamp);

    let mut seen = HashSet::new();
    selected.retain(|p| seen.insert(p.uri.clone()));

    debug!(
        "Selected {} of {} pages for window ({}, {}] (before: {}, after: {})",
        selected.len(),
        pages.len(),
        window.start(),
        window.end(),
        before.is_some(),
        after.is_some()
    );

    selected
}
