use super::{CatalogClient, CatalogLimits};
use crate::models::{CatalogSong, CatalogTag, Page, PlaylistSummary, RemoteTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Every request a `MockCatalog` served, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListPlaylists(Option<String>),
    ListPlaylistTracks { playlist_id: String, cursor: Option<String> },
    FetchByIsrc(Vec<String>),
    FetchById(Vec<String>),
    Equivalents(String),
    Search(String),
    CreatePlaylist(String),
    AddTracks { playlist_id: String, track_ids: Vec<String> },
}

struct MockPlaylist {
    summary: PlaylistSummary,
    tracks: Vec<RemoteTrack>,
}

/// A deterministic in-memory catalog used in tests.
/// Pagination cursors are plain offsets; failures and delays are injectable per operation.
pub struct MockCatalog {
    catalog: CatalogTag,
    limits: CatalogLimits,
    page_size: usize,
    songs: Mutex<Vec<CatalogSong>>,
    equivalents: Mutex<HashMap<String, Vec<CatalogSong>>>,
    search_results: Mutex<HashMap<String, Vec<CatalogSong>>>,
    playlists: Mutex<Vec<MockPlaylist>>,
    failing: Mutex<HashSet<&'static str>>,
    track_delays: Mutex<VecDeque<Duration>>,
    create_without_id: Mutex<bool>,
    created: AtomicUsize,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: usize) -> Result<Page<T>> {
    let start = match cursor {
        None => 0,
        Some(c) => c.parse::<usize>().map_err(|_| anyhow!("bad cursor {:?}", c))?,
    };
    let end = (start + page_size).min(items.len());
    let page = items.get(start..end).unwrap_or_default().to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    Ok(Page { items: page, next })
}

impl MockCatalog {
    pub fn new(catalog: CatalogTag) -> Self {
        Self {
            catalog,
            limits: CatalogLimits::default(),
            page_size: 100,
            songs: Mutex::new(Vec::new()),
            equivalents: Mutex::new(HashMap::new()),
            search_results: Mutex::new(HashMap::new()),
            playlists: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            track_delays: Mutex::new(VecDeque::new()),
            create_without_id: Mutex::new(false),
            created: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_limits(mut self, limits: CatalogLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_songs(self, songs: Vec<CatalogSong>) -> Self {
        lock(&self.songs).extend(songs);
        self
    }

    pub fn with_equivalents(self, native_id: &str, equivalents: Vec<CatalogSong>) -> Self {
        lock(&self.equivalents).insert(native_id.to_string(), equivalents);
        self
    }

    /// Pin the result of one exact search query.
    pub fn with_search_results(self, query: &str, results: Vec<CatalogSong>) -> Self {
        lock(&self.search_results).insert(query.to_string(), results);
        self
    }

    pub fn with_playlist(self, id: &str, name: &str, tracks: Vec<RemoteTrack>) -> Self {
        lock(&self.playlists).push(MockPlaylist {
            summary: PlaylistSummary { id: id.to_string(), name: name.to_string() },
            tracks,
        });
        self
    }

    /// Make `create_playlist` succeed without handing back an id.
    pub fn creating_without_id(self) -> Self {
        *lock(&self.create_without_id) = true;
        self
    }

    /// Make every call of `operation` (a `CatalogClient` method name) fail.
    pub fn fail_on(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    /// Delay the next first-page `list_playlist_tracks` call by `delay`.
    pub fn push_track_listing_delay(&self, delay: Duration) {
        lock(&self.track_delays).push_back(delay);
    }

    pub fn set_playlist_tracks(&self, playlist_id: &str, tracks: Vec<RemoteTrack>) {
        if let Some(p) = lock(&self.playlists).iter_mut().find(|p| p.summary.id == playlist_id) {
            p.tracks = tracks;
        }
    }

    pub fn playlist_tracks(&self, playlist_id: &str) -> Option<Vec<RemoteTrack>> {
        lock(&self.playlists)
            .iter()
            .find(|p| p.summary.id == playlist_id)
            .map(|p| p.tracks.clone())
    }

    pub fn playlist_summaries(&self) -> Vec<PlaylistSummary> {
        lock(&self.playlists).iter().map(|p| p.summary.clone()).collect()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Id batches passed to `fetch_tracks_by_id`, in call order.
    pub fn fetch_by_id_batches(&self) -> Vec<Vec<String>> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::FetchById(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, operation: &'static str, call: MockCall) -> Result<()> {
        lock(&self.calls).push(call);
        if lock(&self.failing).contains(operation) {
            return Err(anyhow!("injected failure in {}", operation));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn catalog(&self) -> CatalogTag {
        self.catalog
    }

    fn limits(&self) -> CatalogLimits {
        self.limits
    }

    async fn list_playlists(&self, cursor: Option<&str>) -> Result<Page<PlaylistSummary>> {
        self.record("list_playlists", MockCall::ListPlaylists(cursor.map(str::to_string)))?;
        paginate(&self.playlist_summaries(), cursor, self.page_size)
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteTrack>> {
        self.record(
            "list_playlist_tracks",
            MockCall::ListPlaylistTracks {
                playlist_id: playlist_id.to_string(),
                cursor: cursor.map(str::to_string),
            },
        )?;
        if cursor.is_none() {
            let delay = lock(&self.track_delays).pop_front();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
        }
        let tracks = self
            .playlist_tracks(playlist_id)
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))?;
        paginate(&tracks, cursor, self.page_size)
    }

    async fn fetch_tracks_by_isrc(&self, isrcs: &[String]) -> Result<Vec<CatalogSong>> {
        self.record("fetch_tracks_by_isrc", MockCall::FetchByIsrc(isrcs.to_vec()))?;
        let wanted: HashSet<String> = isrcs.iter().map(|i| i.to_ascii_uppercase()).collect();
        Ok(lock(&self.songs)
            .iter()
            .filter(|s| s.isrc_key().map_or(false, |k| wanted.contains(&k)))
            .cloned()
            .collect())
    }

    async fn fetch_tracks_by_id(&self, ids: &[String]) -> Result<Vec<CatalogSong>> {
        self.record("fetch_tracks_by_id", MockCall::FetchById(ids.to_vec()))?;
        let songs = lock(&self.songs);
        Ok(ids
            .iter()
            .filter_map(|id| songs.iter().find(|s| &s.native_id == id).cloned())
            .collect())
    }

    async fn fetch_equivalent_tracks(&self, native_id: &str) -> Result<Vec<CatalogSong>> {
        self.record("fetch_equivalent_tracks", MockCall::Equivalents(native_id.to_string()))?;
        Ok(lock(&self.equivalents).get(native_id).cloned().unwrap_or_default())
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogSong>> {
        self.record("search", MockCall::Search(query.to_string()))?;
        if let Some(pinned) = lock(&self.search_results).get(query) {
            return Ok(pinned.clone());
        }
        Ok(lock(&self.songs)
            .iter()
            .filter(|s| !s.name.is_empty() && query.contains(&s.name))
            .cloned()
            .collect())
    }

    async fn create_playlist(&self, name: &str) -> Result<Option<String>> {
        self.record("create_playlist", MockCall::CreatePlaylist(name.to_string()))?;
        if *lock(&self.create_without_id) {
            return Ok(None);
        }
        let id = format!("mock-playlist-{}", self.created.fetch_add(1, Ordering::SeqCst) + 1);
        info!("MockCatalog: created playlist {} ({})", name, id);
        lock(&self.playlists).push(MockPlaylist {
            summary: PlaylistSummary { id: id.clone(), name: name.to_string() },
            tracks: Vec::new(),
        });
        Ok(Some(id))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.record(
            "add_tracks",
            MockCall::AddTracks { playlist_id: playlist_id.to_string(), track_ids: track_ids.to_vec() },
        )?;
        let names: Vec<String> = {
            let songs = lock(&self.songs);
            track_ids
                .iter()
                .map(|id| songs.iter().find(|s| &s.native_id == id).map(|s| s.name.clone()).unwrap_or_default())
                .collect()
        };
        let mut playlists = lock(&self.playlists);
        let playlist = playlists
            .iter_mut()
            .find(|p| p.summary.id == playlist_id)
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))?;
        let base = playlist.tracks.len();
        for (n, (id, name)) in track_ids.iter().zip(names).enumerate() {
            playlist.tracks.push(RemoteTrack {
                entry_id: format!("{}-entry-{}", playlist_id, base + n + 1),
                catalog_id: Some(id.clone()),
                name,
            });
        }
        info!("MockCatalog: add_tracks {} -> {} tracks", playlist_id, track_ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_hands_out_offsets_until_exhausted() {
        let items: Vec<u32> = (0..5).collect();
        let p1 = paginate(&items, None, 2).unwrap();
        assert_eq!(p1, Page { items: vec![0, 1], next: Some("2".into()) });
        let p3 = paginate(&items, Some("4"), 2).unwrap();
        assert_eq!(p3, Page { items: vec![4], next: None });
        assert!(paginate(&items, Some("x"), 2).is_err());
    }
}
