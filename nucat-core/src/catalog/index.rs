//! Catalog index parsing
//!
//! The index document lists every catalog page with the commit timestamp
//! that summarizes it. Page order within the document carries no meaning;
//! selection sorts by timestamp itself.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::entry::parse_commit_timestamp;
use super::page::{items_array, required_str, DocumentKind, PageFetcher};
use crate::error::{CatalogError, Result};

/// A page reference from the index: its summary timestamp and location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub commit_timestamp: DateTime<Utc>,
    pub uri: Url,
}

/// The top-level catalog index
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    /// Location the index was read from
    pub uri: Url,

    /// Latest commit across the whole catalog, when the index reports one
    pub commit_timestamp: Option<DateTime<Utc>>,

    /// Every page listed by the index, in document order
    pub pages: Vec<PageRef>,
}

impl CatalogIndex {
    /// Fetch and parse an index document
    pub async fn read(fetcher: &PageFetcher, uri: &Url) -> Result<Self> {
        let document = fetcher.fetch_document(uri, DocumentKind::Index).await?;
        let index = Self::parse(uri, &document)?;

        if index.pages.is_empty() {
            warn!("Catalog index {} lists no pages", uri);
        } else {
            debug!("Catalog index {} lists {} pages", uri, index.pages.len());
        }

        Ok(index)
    }

    /// Parse an index document
    pub fn parse(uri: &Url, document: &Value) -> Result<Self> {
        let kind = DocumentKind::Index;
        let items = items_array(uri, document, kind)?;

        let pages = items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                let item = item.as_object().ok_or_else(|| {
                    kind.malformed(uri, format!("item {position} is not an object"))
                })?;

                let raw_uri = required_str(uri, kind, position, item, "@id")?;
                let page_uri = uri.join(raw_uri).map_err(|_| CatalogError::InvalidId {
                    uri: uri.clone(),
                    field: "@id",
                    value: raw_uri.to_string(),
                })?;

                let raw_timestamp = required_str(uri, kind, position, item, "commitTimeStamp")?;
                let commit_timestamp = parse_commit_timestamp(raw_timestamp).ok_or_else(|| {
                    CatalogError::InvalidTimestamp {
                        uri: uri.clone(),
                        value: raw_timestamp.to_string(),
                    }
                })?;

                Ok(PageRef {
                    commit_timestamp,
                    uri: page_uri,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // The root timestamp is informational; a missing or odd one is not fatal.
        let commit_timestamp = document
            .get("commitTimeStamp")
            .and_then(Value::as_str)
            .and_then(parse_commit_timestamp);

        Ok(Self {
            uri: uri.clone(),
            commit_timestamp,
            pages,
        })
    }

    /// Number of pages listed
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Latest page summary timestamp
    pub fn latest_page_timestamp(&self) -> Option<DateTime<Utc>> {
        self.pages.iter().map(|p| p.commit_timestamp).max()
    }
}
