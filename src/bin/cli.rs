use anyhow::{anyhow, Context, Result};
use catalog_playlist_sync as lib;
use clap::{Parser, Subcommand, ValueEnum};
use lib::api::{apple_music::AppleMusicCatalog, spotify::SpotifyCatalog, CatalogClient};
use lib::config::Config;
use lib::paginate::PageCollector;
use lib::session::{CatalogSession, PlaylistCache, SyncStatus};
use lib::transfer::TransferPlanner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-sync", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogArg {
    Spotify,
    AppleMusic,
}

#[derive(Subcommand)]
enum Commands {
    /// List every playlist in a catalog
    Playlists {
        #[arg(long, value_enum)]
        catalog: CatalogArg,
    },
    /// Sync one playlist and print its songs
    Show {
        #[arg(long, value_enum)]
        catalog: CatalogArg,
        #[arg(long)]
        playlist: String,
    },
    /// Copy a playlist from one catalog into the other
    Copy {
        #[arg(long, value_enum)]
        from: CatalogArg,
        #[arg(long)]
        playlist: String,
        #[arg(long, value_enum)]
        to: CatalogArg,
    },
    /// Validate config file and exit
    ConfigValidate,
}

fn build_client(cfg: &Config, which: CatalogArg) -> Result<Arc<dyn CatalogClient>> {
    match which {
        CatalogArg::Spotify => {
            let sc = cfg.spotify.as_ref().ok_or_else(|| anyhow!("no [spotify] section in config"))?;
            let client = SpotifyCatalog::from_config(sc);
            if !client.is_authenticated() {
                return Err(anyhow!("spotify access_token is not set"));
            }
            Ok(Arc::new(client))
        }
        CatalogArg::AppleMusic => {
            let ac = cfg.apple_music.as_ref().ok_or_else(|| anyhow!("no [apple_music] section in config"))?;
            let client = AppleMusicCatalog::from_config(ac);
            if !client.is_authenticated() {
                return Err(anyhow!("apple_music developer_token and user_token must be set"));
            }
            Ok(Arc::new(client))
        }
    }
}

async fn synced_playlist(
    session: &CatalogSession,
    playlist_id: &str,
) -> Result<lib::models::Playlist> {
    match session.sync_playlist(playlist_id).await? {
        SyncStatus::Updated(p) | SyncStatus::Unchanged(p) => Ok(p),
        SyncStatus::Superseded => Err(anyhow!("sync of {} was superseded", playlist_id)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // An explicit --config must load; the default location is optional.
    let (cfg, cfg_path) = match &cli.config {
        Some(p) => (
            Config::from_path(p).with_context(|| format!("loading config from {}", p.display()))?,
            p.clone(),
        ),
        None => {
            let p = Config::default_path();
            let cfg = if p.exists() {
                Config::from_path(&p).with_context(|| format!("loading config from {}", p.display()))?
            } else {
                Config::default()
            };
            (cfg, p)
        }
    };

    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "catalog-sync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    let cache = Arc::new(PlaylistCache::new());
    let collector = PageCollector::new(cfg.max_pages);

    match cli.command {
        Commands::Playlists { catalog } => {
            let session = CatalogSession::new(build_client(&cfg, catalog)?, cache, collector);
            for p in session.refresh_playlists().await.context("listing playlists")? {
                println!("{}\t{}", p.id, p.name);
            }
        }
        Commands::Show { catalog, playlist } => {
            let session = CatalogSession::new(build_client(&cfg, catalog)?, cache, collector);
            let p = synced_playlist(&session, &playlist)
                .await
                .with_context(|| format!("syncing playlist {}", playlist))?;
            println!("{} ({} songs)", p.name, p.songs.len());
            for s in &p.songs {
                println!("{}", s.descriptor());
            }
        }
        Commands::Copy { from, playlist, to } => {
            let source = CatalogSession::new(build_client(&cfg, from)?, cache, collector);
            let target = build_client(&cfg, to)?;
            if source.catalog() == target.catalog() {
                return Err(anyhow!("source and target catalog are the same"));
            }
            let p = synced_playlist(&source, &playlist)
                .await
                .with_context(|| format!("syncing playlist {}", playlist))?;
            let report = TransferPlanner::default()
                .copy(&p, target.as_ref())
                .await
                .with_context(|| format!("copying {} to {}", p.name, target.catalog()))?;
            println!("Created {} playlist {} with {} songs", target.catalog(), report.playlist_id, report.added);
            if !report.unavailable.is_empty() {
                println!("Unavailable ({}):", report.unavailable.len());
                for d in &report.unavailable {
                    println!("{}", d);
                }
            }
        }
        Commands::ConfigValidate => match Config::from_path(&cfg_path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        },
    }
    Ok(())
}
