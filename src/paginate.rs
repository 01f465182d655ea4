use crate::api::CatalogClient;
use crate::error::{Error, Result};
use crate::models::{Page, PlaylistSummary, RemoteTrack};
use std::future::Future;
use tracing::debug;

pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Walks a cursor-based "next page" protocol and concatenates every page.
///
/// The collector never retries; the first failing page aborts the walk so
/// callers never see a silently truncated listing. `max_pages` bounds the walk
/// against servers that keep handing back a `next` cursor.
#[derive(Debug, Clone, Copy)]
pub struct PageCollector {
    max_pages: usize,
}

impl Default for PageCollector {
    fn default() -> Self {
        Self { max_pages: DEFAULT_MAX_PAGES }
    }
}

impl PageCollector {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages: max_pages.max(1) }
    }

    /// `fetch_page(None)` requests the first page, later calls get the cursor
    /// from the previous response.
    pub async fn collect_all<T, F, Fut>(
        &self,
        operation: &'static str,
        mut fetch_page: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = anyhow::Result<Page<T>>>,
    {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        for page_no in 0..self.max_pages {
            let page = fetch_page(cursor.take())
                .await
                .map_err(|e| Error::remote(operation, e))?;
            debug!("{}: page {} returned {} items", operation, page_no + 1, page.items.len());
            out.extend(page.items);
            match page.next {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(out),
            }
        }
        Err(Error::PageLimitExceeded { operation, limit: self.max_pages })
    }

    pub async fn all_playlists(&self, client: &dyn CatalogClient) -> Result<Vec<PlaylistSummary>> {
        self.collect_all("list_playlists", |cursor| async move {
            client.list_playlists(cursor.as_deref()).await
        })
        .await
    }

    pub async fn all_playlist_tracks(
        &self,
        client: &dyn CatalogClient,
        playlist_id: &str,
    ) -> Result<Vec<RemoteTrack>> {
        self.collect_all("list_playlist_tracks", |cursor| async move {
            client.list_playlist_tracks(playlist_id, cursor.as_deref()).await
        })
        .await
    }
}
