//! reelmark-enrich - streaming availability enrichment
//!
//! Loads a page snapshot (one title element per line), annotates every
//! element with streaming availability, then treats further lines on stdin
//! as elements appended to the page. With `--serve`, the companion
//! messaging surface is exposed over HTTP until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use reelmark_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use reelmark_common::db::init_database_pool;
use reelmark_common::events::EventBus;
use reelmark_common::time::millis_to_duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reelmark_enrich::cache::{SqliteCacheStore, TwoTierCache, CACHE_TTL};
use reelmark_enrich::config::EnrichmentSettings;
use reelmark_enrich::event_log::log_events;
use reelmark_enrich::page::{PageEvent, PageSurface, SnapshotPage};
use reelmark_enrich::services::{CountryService, TmdbClient};
use reelmark_enrich::types::MetadataApi;
use reelmark_enrich::workflow::{EnrichmentOrchestrator, MutationIngest};
use reelmark_enrich::AppState;

const MODULE_NAME: &str = "reelmark-enrich";

/// Stdin line that simulates a page navigation
const NAVIGATE_COMMAND: &str = "--navigate";

#[derive(Debug, Parser)]
#[command(name = "reelmark-enrich", version, about = "Annotate movie titles with streaming availability")]
struct Args {
    /// Page snapshot: one title element per line
    page: Option<PathBuf>,

    /// Root folder holding the settings database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "REELMARK_CONFIG")]
    config: Option<PathBuf>,

    /// Serve the companion messaging API
    #[arg(long)]
    serve: bool,

    /// Port for the messaging API (overrides TOML)
    #[arg(long)]
    port: Option<u16>,

    /// Debounce window for appended elements, in milliseconds
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Drop expired cache entries before processing
    #[arg(long)]
    purge_expired: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match args.config.clone().or_else(|| default_config_path(MODULE_NAME)) {
        Some(path) => load_toml_config(&path)?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config)?;

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));

    // Root folder and settings database
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_override(args.root_folder.clone())
        .with_toml_config(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = init_database_pool(&db_path).await?;

    let settings = EnrichmentSettings::load(&db, &toml_config).await?;
    settings.require_credentials()?;
    info!(
        region = %settings.region_code,
        targets = settings.target_provider_names.len(),
        "Enrichment settings loaded"
    );

    let mut client = TmdbClient::new(settings.credentials())?;
    if let Some(base_url) = &toml_config.api_base_url {
        client = client.with_base_url(base_url.clone());
    }
    let api: Arc<dyn MetadataApi> = Arc::new(client);

    let cache = Arc::new(TwoTierCache::new(Arc::new(SqliteCacheStore::new(db.clone()))));
    if args.purge_expired {
        match cache.purge_expired(reelmark_common::time::now(), CACHE_TTL).await {
            Ok(removed) => info!(removed, "Purged expired cache entries"),
            Err(e) => warn!(error = %e, "Cache purge failed"),
        }
    }

    let page = Arc::new(match &args.page {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read page snapshot {}", path.display()))?;
            SnapshotPage::from_titles(content.lines().filter(|l| !l.trim().is_empty()))
        }
        None => SnapshotPage::new(),
    });

    let event_bus = EventBus::new(256);
    tokio::spawn(log_events(event_bus.subscribe()));

    let orchestrator = Arc::new(EnrichmentOrchestrator::new(
        api.clone(),
        cache.clone(),
        page.clone(),
        settings,
        event_bus,
    ));

    let server = if args.serve {
        let countries = Arc::new(CountryService::new(db.clone(), api));
        let state = AppState::new(db.clone(), countries, cache);
        let port = args.port.unwrap_or_else(|| toml_config.port());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        info!("Listening on http://127.0.0.1:{}", port);
        Some(tokio::spawn(async move {
            axum::serve(listener, reelmark_enrich::build_router(state)).await
        }))
    } else {
        None
    };

    // Initial page scan
    orchestrator.scan_page().await;

    // Appended elements from stdin
    let (tx, rx) = mpsc::channel(64);
    let ingest = MutationIngest::new(orchestrator.clone(), millis_to_duration(args.debounce_ms));
    let reader_page = page.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            let event = if line == NAVIGATE_COMMAND {
                PageEvent::Navigated
            } else if line.is_empty() {
                continue;
            } else {
                PageEvent::Added(vec![reader_page.append(line)])
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });
    let reports = ingest.run(rx).await;
    info!(batches = reports.len() + 1, "Page processing finished");

    print_annotations(&page);

    if let Some(server) = server {
        info!("Serving messaging API, press Ctrl-C to stop");
        tokio::select! {
            result = server => {
                result??;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match &config.logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn print_annotations(page: &SnapshotPage) {
    let annotations = page.latest_annotations();
    for element in page.candidates() {
        match annotations.get(&element.token) {
            Some(annotation) => println!(
                "{}\t{}\t{}",
                if annotation.available { "available" } else { "unavailable" },
                element.text,
                annotation.providers.join(", ")
            ),
            None => println!("skipped\t{}\t", element.text),
        }
    }
}
