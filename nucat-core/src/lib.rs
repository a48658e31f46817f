//! nucat - incremental reader for package catalog feeds
//!
//! Reads a paginated, append-only catalog of package publish events,
//! returning either the raw events for a time window or the latest event
//! per package version.
//!
//! ```rust,ignore
//! use nucat_core::catalog::{CatalogReader, TimeWindow};
//! use nucat_core::config::CatalogConfig;
//!
//! let reader = CatalogReader::from_config(&CatalogConfig::load()?)?;
//! let window = TimeWindow::since(cursor)?;
//! for entry in reader.get_rolled_up_entries(&window).await? {
//!     println!("{entry}");
//! }
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod transport;

pub use error::{CatalogError, Result, TransportError};
