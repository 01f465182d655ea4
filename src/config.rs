use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Upper bound on pages fetched for one listing.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default)]
    pub spotify: Option<SpotifyConfig>,

    #[serde(default)]
    pub apple_music: Option<AppleMusicConfig>,
}

/// Optional per-catalog batch overrides; clamped to the endpoint limits.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BatchOverrides {
    #[serde(default)]
    pub isrc_batch_size: Option<usize>,
    #[serde(default)]
    pub id_batch_size: Option<usize>,
    #[serde(default)]
    pub add_batch_size: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpotifyConfig {
    #[serde(default = "default_spotify_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_spotify_market")]
    pub market: String,
    #[serde(flatten)]
    pub batches: BatchOverrides,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppleMusicConfig {
    #[serde(default = "default_apple_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub developer_token: String,
    #[serde(default)]
    pub user_token: String,
    #[serde(default = "default_storefront")]
    pub storefront: String,
    #[serde(flatten)]
    pub batches: BatchOverrides,
}

fn default_log_dir() -> PathBuf { "logs".into() }
fn default_max_pages() -> usize { crate::paginate::DEFAULT_MAX_PAGES }
fn default_spotify_api_base() -> String { "https://api.spotify.com/v1".into() }
fn default_spotify_market() -> String { "from_token".into() }
fn default_apple_api_base() -> String { "https://api.music.apple.com".into() }
fn default_storefront() -> String { "us".into() }

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            max_pages: default_max_pages(),
            spotify: None,
            apple_music: None,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// `$XDG_CONFIG_HOME/catalog-sync/config.toml` if it exists, else `config.toml`.
    pub fn default_path() -> PathBuf {
        if let Some(dir) = dirs::config_dir() {
            let p = dir.join("catalog-sync").join("config.toml");
            if p.exists() {
                return p;
            }
        }
        PathBuf::from("config.toml")
    }
}
