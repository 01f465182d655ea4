pub mod apple_music;
pub mod mock;
pub mod spotify;

use crate::models::{CatalogSong, CatalogTag, Page, PlaylistSummary, RemoteTrack};
use anyhow::Result;

/// Per-endpoint batch sizes. Callers never send more ids than these in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLimits {
    /// Max ISRCs per `fetch_tracks_by_isrc` call.
    pub isrc_batch: usize,
    /// Max ids per `fetch_tracks_by_id` call.
    pub id_batch: usize,
    /// Max ids per `add_tracks` call.
    pub add_batch: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self { isrc_batch: 25, id_batch: 300, add_batch: 100 }
    }
}

impl CatalogLimits {
    /// Apply optional overrides, clamping each to `self` and to at least 1.
    pub fn with_overrides(
        self,
        isrc: Option<usize>,
        id: Option<usize>,
        add: Option<usize>,
    ) -> Self {
        let pick = |hard: usize, wanted: Option<usize>| {
            wanted.map(|w| w.clamp(1, hard)).unwrap_or(hard)
        };
        Self {
            isrc_batch: pick(self.isrc_batch, isrc),
            id_batch: pick(self.id_batch, id),
            add_batch: pick(self.add_batch, add),
        }
    }
}

/// CatalogClient: the typed operations the engine needs from one catalog.
/// Implementations: spotify::SpotifyCatalog, apple_music::AppleMusicCatalog, mock::MockCatalog.
///
/// Transport, decoding and authentication stay behind this trait; missing
/// optional fields (no ISRC, no playability info) are mapped to `None` /
/// `playable = false`, never to an error.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// One page of the user's playlists. `cursor == None` requests the first page.
    async fn list_playlists(&self, cursor: Option<&str>) -> Result<Page<PlaylistSummary>>;

    /// One page of a playlist's track listing.
    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteTrack>>;

    /// Catalog songs carrying any of the given ISRCs (at most `limits().isrc_batch`).
    async fn fetch_tracks_by_isrc(&self, isrcs: &[String]) -> Result<Vec<CatalogSong>>;

    /// Catalog songs for native ids (at most `limits().id_batch`).
    async fn fetch_tracks_by_id(&self, ids: &[String]) -> Result<Vec<CatalogSong>>;

    /// Alternate entries the catalog considers interchangeable with `native_id`.
    async fn fetch_equivalent_tracks(&self, native_id: &str) -> Result<Vec<CatalogSong>>;

    /// Free-text song search.
    async fn search(&self, query: &str) -> Result<Vec<CatalogSong>>;

    /// Create a playlist, returning its id when the catalog reports one.
    async fn create_playlist(&self, name: &str) -> Result<Option<String>>;

    /// Append tracks (native ids) to a playlist (batching done by caller).
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    fn catalog(&self) -> CatalogTag;

    fn limits(&self) -> CatalogLimits {
        CatalogLimits::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_clamped_to_endpoint_limits() {
        let hard = CatalogLimits { isrc_batch: 25, id_batch: 50, add_batch: 100 };
        let l = hard.with_overrides(Some(100), Some(10), Some(0));
        assert_eq!(l, CatalogLimits { isrc_batch: 25, id_batch: 10, add_batch: 1 });
        assert_eq!(hard.with_overrides(None, None, None), hard);
    }
}
