use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use punytunes_artwork::application::{ResolveArtworkUseCase, ResolvedArtwork};
use punytunes_artwork::domain::StreamerPayload;
use punytunes_artwork::domain::entities::{PayloadDocument, collect_art_urls};
use punytunes_artwork::infrastructure::{
    AppConfig, ArtworkCache, CliArgs, HttpArtworkTransport, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn read_payloads(paths: &[PathBuf]) -> Result<Vec<StreamerPayload>> {
    let mut payloads = Vec::with_capacity(paths.len());
    for path in paths {
        let text = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Failed to read payload {}", path.display()))?;
        let document: PayloadDocument = serde_json::from_str(&text)
            .wrap_err_with(|| format!("Unrecognised payload in {}", path.display()))?;
        payloads.push(document.into_payload());
    }
    Ok(payloads)
}

async fn write_artwork(dir: &Path, resolved: &[ResolvedArtwork]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .wrap_err_with(|| format!("Failed to create {}", dir.display()))?;

    for (index, item) in resolved.iter().enumerate() {
        if let Some(artwork) = &item.artwork {
            let path = dir.join(format!("artwork-{index:03}.png"));
            tokio::fs::write(&path, artwork.bytes())
                .await
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = punytunes_artwork::VERSION, "Starting artwork resolver");

    let transport = Arc::new(HttpArtworkTransport::new(config.artwork.request_timeout())?);
    let cache = ArtworkCache::with_transport(
        transport,
        config.artwork.pool_config(),
        config.artwork.cache_config(),
    );
    let use_case = ResolveArtworkUseCase::new(Arc::new(cache.clone()));

    let payloads = read_payloads(&args.payload).await?;
    let mut urls = args.urls.clone();
    for url in collect_art_urls(&payloads) {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    let resolved = use_case.execute(&urls).await;

    if let Some(dir) = &args.output_dir {
        write_artwork(dir, &resolved).await?;
    }

    for item in &resolved {
        match &item.artwork {
            Some(artwork) if args.data_uri => println!("{}\t{}", item.url, artwork.to_data_uri()),
            Some(artwork) => println!(
                "{}\t{}x{}\t{} bytes",
                item.url,
                artwork.width(),
                artwork.height(),
                artwork.len()
            ),
            None => println!("{}\tno artwork", item.url),
        }
    }
    println!("{}", cache.stats());

    Ok(())
}
