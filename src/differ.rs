use crate::api::CatalogClient;
use crate::error::{Error, Result};
use crate::models::{CatalogSong, Playlist, RemoteTrack};
use std::collections::HashSet;
use tracing::debug;

/// Brings a cached playlist in line with a fresh track listing from the same
/// catalog, fetching metadata only for tracks the cache has not seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaylistDiffer {
    batch_size: Option<usize>,
}

impl PlaylistDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size: Some(batch_size) }
    }

    /// Returns the updated playlist, or `None` when it is unchanged.
    ///
    /// Entries without a playable catalog id take no part in membership:
    /// they neither keep a cached song alive nor trigger a fetch.
    pub async fn sync(
        &self,
        cached: &Playlist,
        fresh: &[RemoteTrack],
        client: &dyn CatalogClient,
    ) -> Result<Option<Playlist>> {
        let present: HashSet<&str> = fresh.iter().filter_map(RemoteTrack::playable_id).collect();

        let mut songs: Vec<CatalogSong> = cached
            .songs
            .iter()
            .filter(|s| present.contains(s.native_id.as_str()))
            .cloned()
            .collect();
        let removed = cached.songs.len() - songs.len();

        let mut known: HashSet<String> = songs.iter().map(|s| s.native_id.clone()).collect();
        let extra: Vec<String> = fresh
            .iter()
            .filter_map(RemoteTrack::playable_id)
            .filter(|id| known.insert((*id).to_string()))
            .map(str::to_string)
            .collect();

        let hard = client.limits().id_batch.max(1);
        let batch_size = self.batch_size.map(|b| b.clamp(1, hard)).unwrap_or(hard);
        for chunk in extra.chunks(batch_size) {
            let fetched = client
                .fetch_tracks_by_id(chunk)
                .await
                .map_err(|e| Error::remote("fetch_tracks_by_id", e))?;
            songs.extend(fetched);
        }

        debug!(
            "Playlist {} ({}): {} removed, {} new ids fetched",
            cached.name,
            cached.catalog,
            removed,
            extra.len()
        );

        if songs == cached.songs {
            return Ok(None);
        }
        Ok(Some(Playlist {
            id: cached.id.clone(),
            name: cached.name.clone(),
            catalog: cached.catalog,
            songs,
        }))
    }
}
