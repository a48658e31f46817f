//! Catalog reader - windowed, incremental reads over a catalog feed
//!
//! A read fetches the index, selects the pages that can hold entries in the
//! requested window, loads them concurrently and filters the result down to
//! the exact window. Page selection is deliberately generous at the edges;
//! only the final filter decides membership.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::entry::CatalogEntry;
use super::index::{CatalogIndex, PageRef};
use super::loader::ConcurrentPageLoader;
use super::package_set::PackageSet;
use super::page::{EntryFields, PageFetcher};
use super::rollup::{rollup, sort_commit_time_desc};
use super::window::{select_pages, TimeWindow};
use crate::cancel::CancelToken;
use crate::config::{DEFAULT_MAX_CONCURRENCY, FULL_SCAN_MAX_CONCURRENCY};
use crate::error::{CatalogError, Result};
use crate::transport::Transport;

/// Reads entries from a catalog
#[derive(Clone)]
pub struct CatalogReader {
    index_uri: Url,
    fetcher: PageFetcher,
    max_concurrency: usize,
    full_scan_concurrency: usize,
    cancel: Option<CancelToken>,
}

impl CatalogReader {
    /// Create a reader for the catalog at `index_uri`
    pub fn new(index_uri: Url, transport: Arc<dyn Transport>) -> Self {
        debug!(
            "Creating catalog reader for {} via {} transport",
            index_uri,
            transport.name()
        );
        Self {
            index_uri,
            fetcher: PageFetcher::new(transport),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            full_scan_concurrency: FULL_SCAN_MAX_CONCURRENCY,
            cancel: None,
        }
    }

    /// Create a reader over HTTP from configuration
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::CatalogConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let transport = crate::transport::HttpTransport::from_config(config)?;

        let reader = Self::new(config.index_url()?, Arc::new(transport))
            .with_fields(EntryFields {
                id: config.id_field.clone(),
                version: config.version_field.clone(),
            })
            .with_max_concurrency(config.max_concurrency)?
            .with_full_scan_concurrency(config.full_scan_concurrency)?;

        Ok(reader)
    }

    /// Read package identity from different page item properties
    pub fn with_fields(mut self, fields: EntryFields) -> Self {
        self.fetcher = self.fetcher.with_fields(fields);
        self
    }

    /// Page fetches in flight for windowed reads
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(CatalogError::InvalidConcurrency);
        }
        self.max_concurrency = max_concurrency;
        Ok(self)
    }

    /// Page fetches in flight for full-history reads
    pub fn with_full_scan_concurrency(mut self, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(CatalogError::InvalidConcurrency);
        }
        self.full_scan_concurrency = max_concurrency;
        Ok(self)
    }

    /// Abort reads when `token` fires
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn index_uri(&self) -> &Url {
        &self.index_uri
    }

    /// Fetch and parse the catalog index
    pub async fn read_index(&self) -> Result<CatalogIndex> {
        self.guard(CatalogIndex::read(&self.fetcher, &self.index_uri))
            .await
    }

    /// Pages a read of `window` would fetch, oldest first
    pub async fn select_pages(&self, window: &TimeWindow) -> Result<Vec<PageRef>> {
        let index = self.read_index().await?;
        Ok(select_pages(&index.pages, window))
    }

    /// Entries committed in `window`, in no particular order
    pub async fn get_entries(&self, window: &TimeWindow) -> Result<Vec<CatalogEntry>> {
        self.guard(self.read_window(window, self.max_concurrency))
            .await
    }

    /// Every entry in the catalog, in no particular order
    pub async fn get_all_entries(&self) -> Result<Vec<CatalogEntry>> {
        self.guard(self.read_window(&TimeWindow::full_history(), self.full_scan_concurrency))
            .await
    }

    /// Entries committed in `window`, newest first
    pub async fn get_entries_commit_time_desc(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<CatalogEntry>> {
        let mut entries = self.get_entries(window).await?;
        sort_commit_time_desc(&mut entries);
        Ok(entries)
    }

    /// Every entry in the catalog, newest first
    pub async fn get_all_entries_commit_time_desc(&self) -> Result<Vec<CatalogEntry>> {
        let mut entries = self.get_all_entries().await?;
        sort_commit_time_desc(&mut entries);
        Ok(entries)
    }

    /// Latest entry per id/version committed in `window`, newest first
    ///
    /// Older edits of the same id/version are dropped.
    pub async fn get_rolled_up_entries(&self, window: &TimeWindow) -> Result<Vec<CatalogEntry>> {
        let entries = self.get_entries(window).await?;
        let rolled = rollup(entries);
        debug!("Rolled up to {} entries", rolled.len());
        Ok(rolled)
    }

    /// Latest entry per id/version across the whole catalog, newest first
    pub async fn get_all_rolled_up_entries(&self) -> Result<Vec<CatalogEntry>> {
        let entries = self.get_all_entries().await?;
        Ok(rollup(entries))
    }

    /// Id to versions index of every id/version with an event in `window`
    pub async fn get_package_set(&self, window: &TimeWindow) -> Result<PackageSet> {
        let rolled = self.get_rolled_up_entries(window).await?;
        Ok(PackageSet::from_rolled_up(&rolled))
    }

    /// Id to versions index of every id/version in the catalog
    pub async fn get_all_package_set(&self) -> Result<PackageSet> {
        let rolled = self.get_all_rolled_up_entries().await?;
        Ok(PackageSet::from_rolled_up(&rolled))
    }

    /// Like [`get_package_set`](Self::get_package_set), without id/versions
    /// whose latest event in `window` is a delete
    pub async fn get_existing_package_set(&self, window: &TimeWindow) -> Result<PackageSet> {
        let rolled = self.get_rolled_up_entries(window).await?;
        Ok(PackageSet::existing_from_rolled_up(&rolled))
    }

    /// Every package currently in the catalog
    pub async fn get_all_existing_package_set(&self) -> Result<PackageSet> {
        let rolled = self.get_all_rolled_up_entries().await?;
        Ok(PackageSet::existing_from_rolled_up(&rolled))
    }

    async fn read_window(
        &self,
        window: &TimeWindow,
        max_concurrency: usize,
    ) -> Result<Vec<CatalogEntry>> {
        if window.is_empty() {
            debug!("Window ({}, {}] is empty", window.start(), window.end());
            return Ok(Vec::new());
        }

        let index = CatalogIndex::read(&self.fetcher, &self.index_uri).await?;
        let pages = select_pages(&index.pages, window);
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let loader = ConcurrentPageLoader::new(self.fetcher.clone(), max_concurrency)?;
        let fetched = loader.load_pages(pages.into_iter().map(|p| p.uri)).await?;

        let fetched_count = fetched.len();
        let entries: Vec<CatalogEntry> = fetched
            .into_iter()
            .filter(|e| window.contains(e.commit_timestamp()))
            .collect();

        info!(
            "Read {} entries in ({}, {}] ({} outside the window discarded)",
            entries.len(),
            window.start(),
            window.end(),
            fetched_count - entries.len()
        );

        Ok(entries)
    }

    /// Run `read`, giving up as soon as cancellation is signalled
    async fn guard<T>(&self, read: impl Future<Output = Result<T>>) -> Result<T> {
        let Some(token) = &self.cancel else {
            return read.await;
        };

        if token.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }

        tokio::select! {
            result = read => result,
            _ = token.cancelled() => {
                warn!("Catalog read of {} cancelled", self.index_uri);
                Err(CatalogError::Cancelled)
            }
        }
    }
}
