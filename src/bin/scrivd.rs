//! scrivd: the Scrivener daemon.
//!
//! Serves the generation endpoint over HTTP, with subjects, the usage log and
//! the encrypted API key kept under the configured data directory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scrivener::keystore::FileCredentialStore;
use scrivener::server::auth::NonceSigner;
use scrivener::server::config::{Config, Secrets};
use scrivener::server::{AppState, build_router};
use scrivener::subjects::FileSubjectRepository;
use scrivener::usage::JsonlUsageLog;
use scrivener::{Generator, Scrivener, ScrivenerError};

/// Scrivener daemon: AI text generation for editorial content.
#[derive(Parser)]
#[command(name = "scrivd")]
#[command(version = scrivener::PKG_VERSION)]
#[command(about = "Scrivener content generation daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Path to secrets file (default: ~/.scrivener/secrets.toml, then /etc/scrivener/secrets.toml).
    #[arg(long)]
    secrets: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = match args.secrets.as_deref() {
        Some(path) => Secrets::load_from_file(path)?,
        None => Secrets::load()?,
    };
    let secret = secrets.secret()?;

    let generator = build_generator(&config, &secret).await?;
    if let Some(key) = secrets.api_key() {
        generator.set_api_key(&key).await?;
        info!("API key loaded from secrets");
    }

    let tokens = secrets.token_table();
    if tokens.is_empty() {
        tracing::warn!("no bearer tokens configured; every request will be rejected");
    }

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| ScrivenerError::Configuration(format!("Invalid address: {e}")))?;

    info!(version = scrivener::version_string(), %addr, "scrivd starting");

    let state = AppState::new(Arc::new(generator), tokens, NonceSigner::new(secret));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

/// Build a [`Generator`] from configuration.
async fn build_generator(config: &Config, secret: &str) -> Result<Generator, ScrivenerError> {
    let storage = &config.storage;
    tokio::fs::create_dir_all(&storage.data_dir)
        .await
        .map_err(|e| {
            ScrivenerError::Storage(format!("failed to create {:?}: {e}", storage.data_dir))
        })?;

    let mut builder = Scrivener::builder()
        .settings(config.settings.clone())
        .secret(secret)
        .subjects(Arc::new(FileSubjectRepository::new(storage.subjects_dir())))
        .credentials(Arc::new(FileCredentialStore::new(storage.credential_file())))
        .usage_log(Arc::new(JsonlUsageLog::new(storage.usage_log())))
        .timeout(Duration::from_secs(config.provider.timeout_secs));

    if let Some(ref url) = config.provider.base_url {
        builder = builder.base_url(url);
    }

    builder.build()
}
