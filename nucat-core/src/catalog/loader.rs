//! Bounded concurrent page loading
//!
//! Each page is fetched and parsed on its own tokio task, with at most
//! `max_concurrency` tasks running. On a multi-threaded runtime the parses
//! run in parallel across worker threads. Completion order follows the
//! network, not the order the uris were given in. The first failure ends the
//! load and aborts every task still running.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use super::entry::CatalogEntry;
use super::page::PageFetcher;
use crate::error::{CatalogError, Result};

/// Entries parsed from one page
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub uri: Url,
    pub entries: Vec<CatalogEntry>,
}

/// Fetches many pages through a bounded pool
#[derive(Clone)]
pub struct ConcurrentPageLoader {
    fetcher: PageFetcher,
    max_concurrency: usize,
}

impl ConcurrentPageLoader {
    pub fn new(fetcher: PageFetcher, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(CatalogError::InvalidConcurrency);
        }
        Ok(Self {
            fetcher,
            max_concurrency,
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Stream pages in completion order
    ///
    /// No more than `max_concurrency` page tasks run at once; a new one is
    /// spawned only when a running one finishes. Must be polled inside a tokio
    /// runtime. Dropping the stream aborts the tasks still running.
    pub fn stream_pages(&self, uris: Vec<Url>) -> impl Stream<Item = Result<LoadedPage>> + '_ {
        stream::iter(uris)
            .map(move |uri| {
                let fetcher = self.fetcher.clone();
                PageTask(tokio::spawn(async move {
                    let entries = fetcher.fetch_entries(&uri).await?;
                    Ok::<_, CatalogError>(LoadedPage { uri, entries })
                }))
            })
            .buffer_unordered(self.max_concurrency)
    }

    /// Fetch every page and collect all of their entries
    ///
    /// Either every page loads or the first error is returned; partial
    /// results are never handed back.
    pub async fn load_pages(&self, uris: impl IntoIterator<Item = Url>) -> Result<Vec<CatalogEntry>> {
        let uris: Vec<Url> = uris.into_iter().collect();
        let total = uris.len();
        debug!(
            "Loading {} pages with up to {} in flight",
            total, self.max_concurrency
        );

        let mut pages = std::pin::pin!(self.stream_pages(uris));
        let mut entries = Vec::new();
        let mut loaded = 0usize;

        while let Some(page) = pages.try_next().await? {
            loaded += 1;
            debug!(
                "Loaded page {} ({} entries, {}/{})",
                page.uri,
                page.entries.len(),
                loaded,
                total
            );
            entries.extend(page.entries);
        }

        info!("Loaded {} entries from {} pages", entries.len(), loaded);
        Ok(entries)
    }
}

/// A spawned page fetch, aborted when dropped
struct PageTask(JoinHandle<Result<LoadedPage>>);

impl Future for PageTask {
    type Output = Result<LoadedPage>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Only `Drop` aborts the task, and nothing polls it after that
            Err(_) => Err(CatalogError::Cancelled),
        })
    }
}

impl Drop for PageTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
