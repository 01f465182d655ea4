use super::{CatalogClient, CatalogLimits};
use crate::config::SpotifyConfig;
use crate::models::{CatalogSong, CatalogTag, Page, PlaylistSummary, RemoteTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::env;

/// Hard limits of the Spotify Web API endpoints we batch against.
/// Spotify has no multi-ISRC filter; each ISRC costs one search request.
pub const SPOTIFY_LIMITS: CatalogLimits = CatalogLimits { isrc_batch: 25, id_batch: 50, add_batch: 100 };

/// Spotify catalog backed by the Spotify Web API.
/// Uses a caller-supplied access token; the endpoint base may be overridden by
/// SPOTIFY_API_BASE (useful for tests).
pub struct SpotifyCatalog {
    client: Client,
    api_base: String,
    access_token: String,
    market: String,
    limits: CatalogLimits,
}

/// `is_playable` is only reported when a market is given; absent means
/// unplayable. Local files are never playable from the catalog.
fn playable(t: &Value) -> bool {
    !t["is_local"].as_bool().unwrap_or(false) && t["is_playable"].as_bool().unwrap_or(false)
}

/// Map one Spotify track object. Tracks without an id (local files) are skipped.
fn song_from_json(t: &Value) -> Option<CatalogSong> {
    let id = t["id"].as_str().filter(|s| !s.is_empty())?;
    Some(CatalogSong {
        native_id: id.to_string(),
        isrc: t["external_ids"]["isrc"].as_str().map(|s| s.to_string()),
        name: t["name"].as_str().unwrap_or("").to_string(),
        artist: t["artists"][0]["name"].as_str().unwrap_or("Unknown").to_string(),
        album: t["album"]["name"].as_str().unwrap_or("").to_string(),
        playable: playable(t),
    })
}

fn next_cursor(j: &Value) -> Option<String> {
    j["next"].as_str().filter(|s| !s.is_empty()).map(|s| s.to_string())
}

impl SpotifyCatalog {
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        market: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            market: market.into(),
            limits: SPOTIFY_LIMITS,
        }
    }

    /// Build from config; SPOTIFY_API_BASE and SPOTIFY_ACCESS_TOKEN win over file values.
    pub fn from_config(cfg: &SpotifyConfig) -> Self {
        let api_base = env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| cfg.api_base.clone());
        let token = env::var("SPOTIFY_ACCESS_TOKEN").unwrap_or_else(|_| cfg.access_token.clone());
        let b = &cfg.batches;
        Self::new(api_base, token, cfg.market.clone()).with_limits(SPOTIFY_LIMITS.with_overrides(
            b.isrc_batch_size,
            b.id_batch_size,
            b.add_batch_size,
        ))
    }

    pub fn with_limits(mut self, limits: CatalogLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(anyhow!("{} rate_limited: retry_after={:?}", what, retry_after));
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed: {} => {}", what, status, txt));
        }
        Ok(resp)
    }

    async fn get_json(&self, url: &str, what: &str) -> Result<Value> {
        let resp = self.send(self.client.get(url), what).await?;
        Ok(resp.json().await?)
    }

    async fn search_tracks(&self, q: &str, limit: u32) -> Result<Vec<CatalogSong>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}&market={}",
            self.api_base,
            urlencoding::encode(q),
            limit,
            self.market
        );
        let j = self.get_json(&url, "search").await?;
        Ok(j["tracks"]["items"]
            .as_array()
            .map(|items| items.iter().filter_map(song_from_json).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogClient for SpotifyCatalog {
    fn catalog(&self) -> CatalogTag {
        CatalogTag::Spotify
    }

    fn limits(&self) -> CatalogLimits {
        self.limits
    }

    async fn list_playlists(&self, cursor: Option<&str>) -> Result<Page<PlaylistSummary>> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!("{}/me/playlists?limit=50", self.api_base),
        };
        let j = self.get_json(&url, "list playlists").await?;
        let items = j["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|pl| {
                        Some(PlaylistSummary {
                            id: pl["id"].as_str()?.to_string(),
                            name: pl["name"].as_str().unwrap_or("").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Page { items, next: next_cursor(&j) })
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteTrack>> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!(
                "{}/playlists/{}/tracks?limit=50&market={}",
                self.api_base,
                urlencoding::encode(playlist_id),
                self.market
            ),
        };
        let j = self.get_json(&url, "list playlist tracks").await?;
        let mut items = Vec::new();
        if let Some(rows) = j["items"].as_array() {
            for it in rows {
                let t = &it["track"];
                if t.is_null() {
                    continue;
                }
                let id = t["id"].as_str().filter(|s| !s.is_empty());
                items.push(RemoteTrack {
                    entry_id: t["uri"].as_str().unwrap_or("").to_string(),
                    catalog_id: id.filter(|_| playable(t)).map(|s| s.to_string()),
                    name: t["name"].as_str().unwrap_or("").to_string(),
                });
            }
        }
        Ok(Page { items, next: next_cursor(&j) })
    }

    async fn fetch_tracks_by_isrc(&self, isrcs: &[String]) -> Result<Vec<CatalogSong>> {
        let mut out = Vec::new();
        for isrc in isrcs {
            let found = self.search_tracks(&format!("isrc:{}", isrc), 5).await?;
            debug!("Spotify ISRC {} -> {} tracks", isrc, found.len());
            out.extend(found);
        }
        Ok(out)
    }

    async fn fetch_tracks_by_id(&self, ids: &[String]) -> Result<Vec<CatalogSong>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/tracks?ids={}&market={}", self.api_base, ids.join(","), self.market);
        let j = self.get_json(&url, "fetch tracks").await?;
        Ok(j["tracks"]
            .as_array()
            .map(|items| items.iter().filter_map(song_from_json).collect())
            .unwrap_or_default())
    }

    async fn fetch_equivalent_tracks(&self, native_id: &str) -> Result<Vec<CatalogSong>> {
        // Spotify relinks tracks itself when a market is given; there is no
        // separate equivalents endpoint.
        debug!("Spotify has no equivalents lookup for {}", native_id);
        Ok(Vec::new())
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogSong>> {
        self.search_tracks(query, 20).await
    }

    async fn create_playlist(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/me/playlists", self.api_base);
        let body = json!({ "name": name, "public": false });
        let req = self.client.post(&url).header(CONTENT_TYPE, "application/json").json(&body);
        let j: Value = self.send(req, "create playlist").await?.json().await?;
        Ok(j["id"].as_str().map(|s| s.to_string()))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, urlencoding::encode(playlist_id));
        let uris: Vec<String> = track_ids.iter().map(|id| format!("spotify:track:{}", id)).collect();
        let body = json!({ "uris": uris });
        let req = self.client.post(&url).header(CONTENT_TYPE, "application/json").json(&body);
        self.send(req, "add tracks").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_json_maps_missing_fields_to_defaults() {
        let t = json!({ "id": "abc", "name": "Song", "artists": [], "album": {} });
        let s = song_from_json(&t).unwrap();
        assert_eq!(s.artist, "Unknown");
        assert_eq!(s.isrc, None);
        assert!(!s.playable);
        assert!(song_from_json(&json!({ "id": null, "name": "local.mp3" })).is_none());
    }

    #[test]
    fn listing_and_lookup_share_the_playability_rule() {
        assert!(playable(&json!({ "is_playable": true, "is_local": false })));
        assert!(!playable(&json!({ "is_playable": true, "is_local": true })));
        assert!(!playable(&json!({ "is_playable": false })));
        assert!(!playable(&json!({ "id": "abc" })));
    }
}
