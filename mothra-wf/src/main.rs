//! mothra-wf - workflow component service

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mothra_common::config::MothraConfig;
use mothra_common::logging::init_tracing;
use mothra_wf::{build_router, AppContext};
use tokio::signal;
use tracing::info;

/// Command-line arguments for mothra-wf
#[derive(Parser, Debug)]
#[command(name = "mothra-wf")]
#[command(about = "Relational data mining workflow components over HTTP")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on; overrides `bind_address` from the configuration
    #[arg(short, long, env = "MOTHRA_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MothraConfig::resolve(args.config.as_deref());
    init_tracing(&config.logging);

    info!(
        "Starting mothra-wf v{} [{}] built {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    let bind_address = config.bind_address.clone();
    info!("Public files root: {}", config.public_files_root.display());
    info!("Prolog: {}, Java: {}", config.engines.prolog, config.engines.java);

    let ctx = AppContext::new(config).context("Failed to initialize application context")?;
    let app = build_router(Arc::new(ctx));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("mothra-wf listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("mothra-wf stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
