use crate::api::CatalogClient;
use crate::error::{Error, Result};
use crate::matcher::BatchMatcher;
use crate::models::{Playlist, SongDescriptor};
use tracing::info;

/// What a completed copy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub playlist_id: String,
    pub added: usize,
    pub unavailable: Vec<SongDescriptor>,
}

/// Copies a playlist into another catalog: match, create, add.
///
/// Nothing here is retried. A failure after the playlist was created is
/// returned as-is, leaving the caller to decide about the partial playlist.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferPlanner {
    matcher: BatchMatcher,
}

impl TransferPlanner {
    pub fn new(matcher: BatchMatcher) -> Self {
        Self { matcher }
    }

    pub async fn copy(
        &self,
        source: &Playlist,
        target: &dyn CatalogClient,
    ) -> Result<TransferReport> {
        let report = self.matcher.match_songs(&source.songs, target).await?;

        let playlist_id = target
            .create_playlist(&source.name)
            .await
            .map_err(|e| Error::remote("create_playlist", e))?
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::PlaylistCreation {
                name: source.name.clone(),
                reason: format!("{} returned no playlist id", target.catalog()),
            })?;

        let ids: Vec<String> = report.matched.iter().map(|s| s.native_id.clone()).collect();
        let batch = target.limits().add_batch.max(1);
        for chunk in ids.chunks(batch) {
            target
                .add_tracks(&playlist_id, chunk)
                .await
                .map_err(|e| Error::remote("add_tracks", e))?;
        }

        info!(
            "Copied {} ({}) to {} playlist {}: {} added, {} unavailable",
            source.name,
            source.catalog,
            target.catalog(),
            playlist_id,
            ids.len(),
            report.unavailable.len()
        );

        Ok(TransferReport {
            playlist_id,
            added: ids.len(),
            unavailable: report.unavailable,
        })
    }
}
