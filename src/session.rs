//! In-memory playlist cache for one run of the tool, plus the per-catalog
//! session that keeps it in sync with the remote catalog.
//!
//! Re-syncing a playlist that is already being synced supersedes the older
//! request: every sync takes a ticket carrying a per-playlist generation and
//! only the holder of the newest ticket may write its result back. A slow
//! earlier request that finishes last is dropped instead of overwriting the
//! newer result.
use crate::api::CatalogClient;
use crate::differ::PlaylistDiffer;
use crate::error::{Error, Result};
use crate::models::{CatalogTag, Playlist, PlaylistSummary};
use crate::paginate::PageCollector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

type Key = (CatalogTag, String);

/// Proof that a sync was started; carries the generation it was started at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTicket {
    catalog: CatalogTag,
    playlist_id: String,
    generation: u64,
}

impl SyncTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Unchanged,
    Superseded,
}

#[derive(Debug, Default)]
struct CacheState {
    playlists: HashMap<Key, Playlist>,
    generations: HashMap<Key, u64>,
    listing: HashMap<CatalogTag, Vec<String>>,
}

impl CacheState {
    fn bump(&mut self, key: Key) -> u64 {
        let g = self.generations.entry(key).or_insert(0);
        *g += 1;
        *g
    }
}

#[derive(Debug, Default)]
pub struct PlaylistCache {
    state: Mutex<CacheState>,
}

impl PlaylistCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state is only ever replaced wholesale per key, so a poisoned
        // lock still guards consistent data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install a fresh playlist listing. Known playlists keep their songs;
    /// playlists missing from the listing are dropped and any sync in flight
    /// for them is invalidated.
    pub fn replace_listing(&self, catalog: CatalogTag, summaries: &[PlaylistSummary]) {
        let mut st = self.lock();
        let ids: Vec<String> = summaries.iter().map(|s| s.id.clone()).collect();

        let stale: Vec<Key> = st
            .playlists
            .keys()
            .filter(|(c, id)| *c == catalog && !ids.contains(id))
            .cloned()
            .collect();
        for key in stale {
            debug!("Dropping {} playlist {} from cache", key.0, key.1);
            st.playlists.remove(&key);
            st.bump(key);
        }

        for summary in summaries {
            st.playlists
                .entry((catalog, summary.id.clone()))
                .and_modify(|p| p.name = summary.name.clone())
                .or_insert_with(|| Playlist::from_summary(catalog, summary));
        }
        st.listing.insert(catalog, ids);
    }

    pub fn get(&self, catalog: CatalogTag, playlist_id: &str) -> Option<Playlist> {
        self.lock().playlists.get(&(catalog, playlist_id.to_string())).cloned()
    }

    /// Cached playlists of one catalog in listing order.
    pub fn playlists(&self, catalog: CatalogTag) -> Vec<Playlist> {
        let st = self.lock();
        st.listing
            .get(&catalog)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| st.playlists.get(&(catalog, id.clone())).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Start a sync; any ticket issued earlier for the same playlist becomes stale.
    pub fn begin_sync(&self, catalog: CatalogTag, playlist_id: &str) -> SyncTicket {
        let generation = self.lock().bump((catalog, playlist_id.to_string()));
        SyncTicket { catalog, playlist_id: playlist_id.to_string(), generation }
    }

    pub fn is_current(&self, ticket: &SyncTicket) -> bool {
        let key = (ticket.catalog, ticket.playlist_id.clone());
        self.lock().generations.get(&key) == Some(&ticket.generation)
    }

    /// Write back a sync result if `ticket` is still the newest one.
    /// `None` is the differ's "nothing changed" result.
    ///
    /// Only the songs are taken from `result`. The name belongs to the
    /// playlist listing, which may have been refreshed while the sync ran.
    pub fn commit(&self, ticket: &SyncTicket, result: Option<Playlist>) -> CommitOutcome {
        let mut st = self.lock();
        let key = (ticket.catalog, ticket.playlist_id.clone());
        if st.generations.get(&key) != Some(&ticket.generation) {
            return CommitOutcome::Superseded;
        }
        match result {
            None => CommitOutcome::Unchanged,
            Some(playlist) => {
                st.playlists
                    .entry(key)
                    .and_modify(|p| p.songs = playlist.songs.clone())
                    .or_insert(playlist);
                CommitOutcome::Applied
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Updated(Playlist),
    Unchanged(Playlist),
    /// A newer sync for the same playlist started before this one finished.
    Superseded,
}

impl SyncStatus {
    pub fn playlist(&self) -> Option<&Playlist> {
        match self {
            SyncStatus::Updated(p) | SyncStatus::Unchanged(p) => Some(p),
            SyncStatus::Superseded => None,
        }
    }
}

/// One catalog client bound to the shared cache.
pub struct CatalogSession {
    client: Arc<dyn CatalogClient>,
    cache: Arc<PlaylistCache>,
    collector: PageCollector,
    differ: PlaylistDiffer,
}

impl CatalogSession {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        cache: Arc<PlaylistCache>,
        collector: PageCollector,
    ) -> Self {
        Self { client, cache, collector, differ: PlaylistDiffer::new() }
    }

    pub fn catalog(&self) -> CatalogTag {
        self.client.catalog()
    }

    pub async fn refresh_playlists(&self) -> Result<Vec<Playlist>> {
        let summaries = self.collector.all_playlists(self.client.as_ref()).await?;
        info!("Listed {} playlists from {}", summaries.len(), self.catalog());
        self.cache.replace_listing(self.catalog(), &summaries);
        Ok(self.cache.playlists(self.catalog()))
    }

    /// Re-enumerate one playlist's tracks and fold them into the cache.
    pub async fn sync_playlist(&self, playlist_id: &str) -> Result<SyncStatus> {
        let catalog = self.catalog();
        if self.cache.get(catalog, playlist_id).is_none() {
            self.refresh_playlists().await?;
        }

        let ticket = self.cache.begin_sync(catalog, playlist_id);
        let cached = self.cache.get(catalog, playlist_id).ok_or_else(|| Error::PlaylistNotFound {
            catalog,
            id: playlist_id.to_string(),
        })?;

        let tracks = self
            .collector
            .all_playlist_tracks(self.client.as_ref(), playlist_id)
            .await?;
        let result = self.differ.sync(&cached, &tracks, self.client.as_ref()).await?;

        match self.cache.commit(&ticket, result.clone()) {
            CommitOutcome::Superseded => {
                debug!(
                    "Discarding stale sync of {} playlist {} (generation {})",
                    catalog, playlist_id, ticket.generation
                );
                Ok(SyncStatus::Superseded)
            }
            CommitOutcome::Unchanged => {
                Ok(SyncStatus::Unchanged(self.cache.get(catalog, playlist_id).unwrap_or(cached)))
            }
            CommitOutcome::Applied => {
                let updated = self.cache.get(catalog, playlist_id).or(result).unwrap_or(cached);
                info!("Synced {} playlist {}: {} songs", catalog, updated.name, updated.songs.len());
                Ok(SyncStatus::Updated(updated))
            }
        }
    }
}
