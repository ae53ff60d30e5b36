use anyhow::Result;
use clap::Parser;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use review_poller::config;
use review_poller::{FileStore, ItunesFeedClient, Poller};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single poll cycle for every subject and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let feed = Arc::new(ItunesFeedClient::from_config(&cfg)?);
    let store = Arc::new(FileStore::new(cfg.app.resolved_data_dir()));
    let cancel = CancellationToken::new();
    let poller = Poller::new(feed, store, cfg.feed.country.clone())
        .with_page_timeout(cfg.feed.request_timeout())
        .with_cancellation(cancel.clone());

    if args.once {
        run_cycle(&poller, &cfg.subjects).await;
        return Ok(());
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested; stopping after the current page");
            shutdown.cancel();
        }
    });

    info!(
        subjects = cfg.subjects.len(),
        interval_secs = cfg.app.poll_interval_secs,
        "starting review poller"
    );
    // The first tick fires immediately, so subjects are polled once at start.
    let mut ticker = tokio::time::interval(cfg.app.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_cycle(&poller, &cfg.subjects).await,
            _ = cancel.cancelled() => break,
        }
    }

    info!("review poller stopped");
    Ok(())
}

/// Subjects are polled concurrently; a cycle ends only when every crawl has,
/// so one subject never has two crawls in flight.
async fn run_cycle(poller: &Poller, subjects: &[String]) {
    join_all(subjects.iter().map(|subject| poller.poll(subject))).await;
}
