use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use review_poller::config;
use review_poller::query::recent_reviews;
use review_poller::FileStore;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print stored reviews for an app as JSON, optionally limited to the last N hours"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// App id whose reviews to print
    #[arg(long)]
    subject: String,

    /// Only include reviews dated within this many hours
    #[arg(long)]
    hours: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let store = FileStore::new(cfg.app.resolved_data_dir());

    let reviews = recent_reviews(&store, &args.subject, args.hours, Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&reviews)?);
    Ok(())
}
