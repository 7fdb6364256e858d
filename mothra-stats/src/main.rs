//! get-stats - user sign-up statistics since a cutoff month

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mothra_common::config::MothraConfig;
use mothra_common::logging::init_tracing;
use mothra_stats::{db, UsageStats, YearMonth};

#[derive(Parser, Debug)]
#[command(name = "get-stats")]
#[command(about = "Get some user usage stats")]
#[command(version)]
struct Args {
    /// Cutoff month, `YYYY_MM`
    cutoff: String,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL; overrides `database_url` from the configuration
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = MothraConfig::resolve(args.config.as_deref());
    init_tracing(&config.logging);

    let cutoff: YearMonth = args.cutoff.parse()?;
    let database_url = args
        .database_url
        .or(config.database_url)
        .context("No database URL (use --database-url or set database_url in the config)")?;

    let pool = db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    let users = db::fetch_users(&pool).await?;
    pool.close().await;

    let today = chrono::Local::now().date_naive();
    let stats = UsageStats::collect(&users, cutoff, today)?;
    print!("{}", stats.report());
    Ok(())
}
