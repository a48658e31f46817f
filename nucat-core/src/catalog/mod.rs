//! Catalog reading
//!
//! A catalog is an append-only feed of package events, split into pages
//! that are listed by a single index document.
//!
//! # Architecture
//!
//! ```text
//! index.json                ← (commit timestamp, page uri) per page
//!     │
//!     ▼  select_pages(window): in-range pages + nearest before/after
//! page*.json                ← fetched by ConcurrentPageLoader (bounded)
//!     │
//!     ▼  parse_page
//! CatalogEntry stream       ← filtered to (start, end]
//!     │
//!     ▼  rollup
//! latest entry per id/version ─▶ PackageSet
//! ```

mod entry;
mod index;
mod loader;
mod package_set;
mod page;
mod reader;
mod rollup;
mod version;
mod window;

pub use entry::{
    parse_commit_timestamp, CatalogEntry, EntryKey, PACKAGE_DELETE_TYPE, PACKAGE_DETAILS_TYPE,
};
pub use index::{CatalogIndex, PageRef};
pub use loader::{ConcurrentPageLoader, LoadedPage};
pub use package_set::{PackageSet, PackageVersions};
pub use page::{parse_page, EntryFields, PageFetcher};
pub use reader::CatalogReader;
pub use rollup::{rollup, sort_commit_time_desc, Rollup};
pub use version::{PackageVersion, ParseVersionError};
pub use window::{select_pages, TimeWindow};
