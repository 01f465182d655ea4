use serde::{Deserialize, Serialize};
use std::fmt;

/// Which remote catalog a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogTag {
    Spotify,
    AppleMusic,
}

impl fmt::Display for CatalogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogTag::Spotify => write!(f, "spotify"),
            CatalogTag::AppleMusic => write!(f, "apple_music"),
        }
    }
}

/// A song as described by one catalog. `native_id` is only meaningful inside
/// that catalog; `isrc` is the cross-catalog join key when known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogSong {
    pub native_id: String,
    pub isrc: Option<String>,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub playable: bool,
}

impl CatalogSong {
    pub fn descriptor(&self) -> SongDescriptor {
        SongDescriptor {
            name: self.name.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }

    /// Normalized ISRC usable as a join key; `None` when absent or blank.
    pub fn isrc_key(&self) -> Option<String> {
        self.isrc
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_uppercase())
    }
}

/// Human readable identity of a song that could not be matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDescriptor {
    pub name: String,
    pub artist: String,
    pub album: String,
}

impl fmt::Display for SongDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {} -- {}", self.name, self.artist, self.album)
    }
}

/// One entry of a remote playlist's track listing.
///
/// `catalog_id` is the id usable with `fetch_tracks_by_id`; it is `None` when
/// the catalog reports the entry as not playable (e.g. a local upload or a
/// withdrawn release).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub entry_id: String,
    pub catalog_id: Option<String>,
    pub name: String,
}

impl RemoteTrack {
    pub fn playable_id(&self) -> Option<&str> {
        self.catalog_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Playlist entry returned by `list_playlists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

/// Cached view of one playlist. `songs` keeps insertion order, which after an
/// incremental sync is not necessarily the remote order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub catalog: CatalogTag,
    pub songs: Vec<CatalogSong>,
}

impl Playlist {
    pub fn from_summary(catalog: CatalogTag, summary: &PlaylistSummary) -> Self {
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            catalog,
            songs: Vec::new(),
        }
    }
}

/// Result of matching one source song into the target catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(CatalogSong),
    Replaced {
        original_isrc: String,
        replacement: CatalogSong,
    },
    Unavailable(SongDescriptor),
}

impl MatchOutcome {
    /// The target-catalog song to add, if any.
    pub fn song(&self) -> Option<&CatalogSong> {
        match self {
            MatchOutcome::Matched(s) => Some(s),
            MatchOutcome::Replaced { replacement, .. } => Some(replacement),
            MatchOutcome::Unavailable(_) => None,
        }
    }
}

/// One page of a cursor-paginated listing. `next == None` marks the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
