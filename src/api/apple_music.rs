use super::{CatalogClient, CatalogLimits};
use crate::config::AppleMusicConfig;
use crate::models::{CatalogSong, CatalogTag, Page, PlaylistSummary, RemoteTrack};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::env;
use url::Url;

/// Apple Music API limits: `filter[isrc]` takes 25 codes, `ids` 300, and
/// library playlist adds are sent 100 at a time.
pub const APPLE_MUSIC_LIMITS: CatalogLimits = CatalogLimits { isrc_batch: 25, id_batch: 300, add_batch: 100 };

const TRACK_PAGE_LIMIT: &str = "100";

/// Apple Music catalog + library access.
/// Requests carry the developer token as bearer and the user token in
/// `Music-User-Token`. APPLE_MUSIC_API_BASE overrides the endpoint base.
pub struct AppleMusicCatalog {
    client: Client,
    api_base: String,
    developer_token: String,
    user_token: String,
    storefront: String,
    limits: CatalogLimits,
}

/// Map a catalog song resource. A song without `playParams` cannot be played
/// in the user's storefront.
fn song_from_json(d: &Value) -> Option<CatalogSong> {
    let a = &d["attributes"];
    Some(CatalogSong {
        native_id: d["id"].as_str()?.to_string(),
        isrc: a["isrc"].as_str().map(|s| s.to_string()),
        name: a["name"].as_str().unwrap_or("").to_string(),
        artist: a["artistName"].as_str().unwrap_or("").to_string(),
        album: a["albumName"].as_str().unwrap_or("").to_string(),
        playable: a["playParams"].is_object(),
    })
}

fn songs_from_data(j: &Value) -> Vec<CatalogSong> {
    j["data"]
        .as_array()
        .map(|items| items.iter().filter_map(song_from_json).collect())
        .unwrap_or_default()
}

impl AppleMusicCatalog {
    pub fn new(
        api_base: impl Into<String>,
        developer_token: impl Into<String>,
        user_token: impl Into<String>,
        storefront: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            developer_token: developer_token.into(),
            user_token: user_token.into(),
            storefront: storefront.into(),
            limits: APPLE_MUSIC_LIMITS,
        }
    }

    /// Build from config; APPLE_MUSIC_* environment variables win over file values.
    pub fn from_config(cfg: &AppleMusicConfig) -> Self {
        let api_base = env::var("APPLE_MUSIC_API_BASE").unwrap_or_else(|_| cfg.api_base.clone());
        let dev = env::var("APPLE_MUSIC_DEVELOPER_TOKEN").unwrap_or_else(|_| cfg.developer_token.clone());
        let user = env::var("APPLE_MUSIC_USER_TOKEN").unwrap_or_else(|_| cfg.user_token.clone());
        let b = &cfg.batches;
        Self::new(api_base, dev, user, cfg.storefront.clone()).with_limits(APPLE_MUSIC_LIMITS.with_overrides(
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
        !self.developer_token.is_empty() && !self.user_token.is_empty()
    }

    /// Resolve an API path (or the relative `next` link of a previous page)
    /// against the configured base.
    fn url(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.api_base).with_context(|| format!("invalid api base {}", self.api_base))?;
        base.join(path).with_context(|| format!("invalid path {}", path))
    }

    fn catalog_songs_url(&self, param: &str, value: &str) -> Result<Url> {
        let mut u = self.url(&format!("/v1/catalog/{}/songs", self.storefront))?;
        u.query_pairs_mut().append_pair(param, value);
        Ok(u)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Bearer {}", self.developer_token))
            .header("Music-User-Token", &self.user_token)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed: {} => {}", what, status, txt));
        }
        Ok(resp)
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<Value> {
        let resp = self.send(self.client.get(url), what).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CatalogClient for AppleMusicCatalog {
    fn catalog(&self) -> CatalogTag {
        CatalogTag::AppleMusic
    }

    fn limits(&self) -> CatalogLimits {
        self.limits
    }

    async fn list_playlists(&self, cursor: Option<&str>) -> Result<Page<PlaylistSummary>> {
        let url = self.url(cursor.unwrap_or("/v1/me/library/playlists"))?;
        let j = self.get_json(url, "list library playlists").await?;
        let items = j["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|pl| {
                        Some(PlaylistSummary {
                            id: pl["id"].as_str()?.to_string(),
                            name: pl["attributes"]["name"].as_str().unwrap_or("").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Page { items, next: j["next"].as_str().map(|s| s.to_string()) })
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RemoteTrack>> {
        let mut url = match cursor {
            Some(next) => self.url(next)?,
            None => self.url(&format!(
                "/v1/me/library/playlists/{}/tracks",
                urlencoding::encode(playlist_id)
            ))?,
        };
        if !url.query_pairs().any(|(k, _)| k == "limit") {
            url.query_pairs_mut().append_pair("limit", TRACK_PAGE_LIMIT);
        }

        let resp = self.authorize(self.client.get(url)).send().await?;
        let status = resp.status();
        // The library API answers 404 for a playlist with no tracks.
        if status == StatusCode::NOT_FOUND && cursor.is_none() {
            debug!("Apple Music playlist {} has no tracks", playlist_id);
            return Ok(Page::last(Vec::new()));
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("list library playlist tracks failed: {} => {}", status, txt));
        }
        let j: Value = resp.json().await?;

        let items = j["data"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|t| {
                        let a = &t["attributes"];
                        Some(RemoteTrack {
                            entry_id: t["id"].as_str()?.to_string(),
                            catalog_id: a["playParams"]["catalogId"].as_str().map(|s| s.to_string()),
                            name: a["name"].as_str().unwrap_or("").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Page { items, next: j["next"].as_str().map(|s| s.to_string()) })
    }

    async fn fetch_tracks_by_isrc(&self, isrcs: &[String]) -> Result<Vec<CatalogSong>> {
        if isrcs.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.catalog_songs_url("filter[isrc]", &isrcs.join(","))?;
        Ok(songs_from_data(&self.get_json(url, "fetch songs by isrc").await?))
    }

    async fn fetch_tracks_by_id(&self, ids: &[String]) -> Result<Vec<CatalogSong>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.catalog_songs_url("ids", &ids.join(","))?;
        Ok(songs_from_data(&self.get_json(url, "fetch songs by id").await?))
    }

    async fn fetch_equivalent_tracks(&self, native_id: &str) -> Result<Vec<CatalogSong>> {
        let url = self.catalog_songs_url("filter[equivalents]", native_id)?;
        Ok(songs_from_data(&self.get_json(url, "fetch equivalent songs").await?))
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogSong>> {
        let mut url = self.url(&format!("/v1/catalog/{}/search", self.storefront))?;
        url.query_pairs_mut().append_pair("types", "songs").append_pair("term", query);
        let j = self.get_json(url, "search").await?;
        Ok(songs_from_data(&j["results"]["songs"]))
    }

    async fn create_playlist(&self, name: &str) -> Result<Option<String>> {
        let url = self.url("/v1/me/library/playlists")?;
        let body = json!({ "attributes": { "name": name } });
        let req = self.client.post(url).header(CONTENT_TYPE, "application/json").json(&body);
        let j: Value = self.send(req, "create library playlist").await?.json().await?;
        Ok(j["data"][0]["id"].as_str().map(|s| s.to_string()))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let url = self.url(&format!("/v1/me/library/playlists/{}/tracks", urlencoding::encode(playlist_id)))?;
        let data: Vec<Value> = track_ids.iter().map(|id| json!({ "id": id, "type": "songs" })).collect();
        let req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "data": data }));
        self.send(req, "add library playlist tracks").await?;
        Ok(())
    }
}
