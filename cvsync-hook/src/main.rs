//! cvsync-hook - Main entry point
//!
//! Receives event platform webhooks, keeps the JSON record store in sync and
//! regenerates the site pages after every change.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cvsync_common::config::{load_toml_config, resolve_data_dir, resolve_port, DATA_DIR_ENV};
use cvsync_common::notify::{MailgunNotifier, NoopNotifier, Notifier};
use cvsync_hook::{build_router, AppState, PageSettings};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const AUTH_TOKEN_ENV: &str = "CVENT_AUTH_TOKEN";
const MAILGUN_API_KEY_ENV: &str = "MAILGUN_API_KEY";
const DEFAULT_LOG_FILTER: &str = "cvsync_hook=debug,cvsync_common=debug,tower_http=debug";

/// Command-line arguments for cvsync-hook
#[derive(Parser, Debug)]
#[command(name = "cvsync-hook")]
#[command(about = "Webhook receiver syncing event platform records to the site")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CVSYNC_PORT")]
    port: Option<u16>,

    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    bind_address: Option<String>,

    /// Directory holding sessions/ and speakers/
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for generated pages; generation is off when unset
    #[arg(long, env = "CVSYNC_PAGES_DIR")]
    pages_dir: Option<PathBuf>,

    /// Site base URL used in page paths and links
    #[arg(long, env = "CVSYNC_BASE_URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref()).context("Failed to load config")?;

    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cvsync-hook v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let auth_token = std::env::var(AUTH_TOKEN_ENV)
        .with_context(|| format!("{} must be set", AUTH_TOKEN_ENV))?;

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), DATA_DIR_ENV, &toml_config);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    info!("Data directory: {}", data_dir.display());

    let notifier: Arc<dyn Notifier> = match std::env::var(MAILGUN_API_KEY_ENV) {
        Ok(api_key) if !api_key.trim().is_empty() => Arc::new(
            MailgunNotifier::new(api_key, toml_config.mailgun.clone())
                .context("Failed to initialize Mailgun notifier")?,
        ),
        _ => {
            warn!("{} not set, registration emails will only be logged", MAILGUN_API_KEY_ENV);
            Arc::new(NoopNotifier)
        }
    };

    let mut state = AppState::new(data_dir, auth_token, notifier);
    if let Some(output_dir) = args.pages_dir.or(toml_config.pages_dir.clone()) {
        let base_url = args
            .base_url
            .or(toml_config.base_url.clone())
            .unwrap_or_else(|| "/".to_string());
        info!("Generating pages into {} (base URL {})", output_dir.display(), base_url);
        state = state.with_pages(PageSettings { output_dir, base_url });
    } else {
        info!("No pages directory configured, page generation disabled");
    }

    let app = build_router(state);

    let port = resolve_port(args.port, &toml_config);
    let bind_address = args
        .bind_address
        .or(toml_config.bind_address.clone())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
