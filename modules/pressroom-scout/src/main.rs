use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use pressroom_common::{Config, RunSummary, TargetSpec};
use pressroom_scout::infra::{BrowserlessSession, ClaudeClassifier, FileCacheStore, MemoryCacheStore, RunLog, SerperSearch};
use pressroom_scout::scout::Scout;
use pressroom_scout::traits::{CacheStore, PageSession};

#[derive(Parser)]
#[command(name = "pressroom", about = "Find the official newsroom page of each organization")]
struct Cli {
    /// JSON file with an array of {"name", "domain"} targets
    #[arg(long)]
    targets: Option<PathBuf>,

    /// Targets processed at once; 1 runs sequentially with the inter-target delay
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Keep the cache in memory for this run only
    #[arg(long)]
    no_persist: bool,

    /// Print the cached results and exit
    #[arg(long)]
    list_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pressroom=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("Pressroom scout starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let store: Arc<dyn CacheStore> = if cli.no_persist {
        Arc::new(MemoryCacheStore::new())
    } else {
        Arc::new(FileCacheStore::in_data_dir(&config.data_dir))
    };

    let search = Arc::new(SerperSearch::new(&config.serper_api_key)?);
    let classifier = Arc::new(ClaudeClassifier::new(&config.anthropic_api_key, &config.claude_model));
    let scout = Scout::new(search, classifier, store, config.discovery.clone());

    if cli.list_cache {
        for entry in scout.cache().entries().await? {
            println!(
                "{:<32} {:<6} {:<12} {}",
                entry.domain,
                if entry.success { "found" } else { "none" },
                entry.strategy_used.map(|s| s.as_str()).unwrap_or("-"),
                entry.matched_url.as_deref().unwrap_or("-"),
            );
        }
        return Ok(());
    }

    let path = cli
        .targets
        .context("--targets is required unless --list-cache is given")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let specs: Vec<TargetSpec> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of targets", path.display()))?;
    info!(targets = specs.len(), concurrency = cli.concurrency, "Loaded targets");

    let run_log = RunLog::new(scout.run_id());
    let open_session = || -> Result<Box<dyn PageSession>> {
        let client = BrowserlessClient::new(&config.browserless_url, config.browserless_token.as_deref())?;
        Ok(Box::new(BrowserlessSession::new(client, config.discovery.navigation_timeout)))
    };

    let results = if cli.concurrency <= 1 {
        let session = open_session()?;
        scout.run_batch(session.as_ref(), &specs).await
    } else {
        scout.run_concurrent(&specs, cli.concurrency, open_session).await
    };

    for r in &results {
        info!(
            name = r.target.name.as_str(),
            domain = r.target.domain.as_str(),
            success = r.success,
            url = r.matched_url.as_deref().unwrap_or(""),
            date = r.extracted_date.as_deref().unwrap_or(""),
            strategy = r.strategy_used.map(|s| s.as_str()).unwrap_or("none"),
            candidates_checked = r.candidates_checked,
            "Result"
        );
    }

    let log_path = run_log.save(&config.data_dir, &results)?;
    let summary = RunSummary::from_results(&results);
    info!(run_id = %run_log.run_id, log = %log_path.display(), "{summary}");

    Ok(())
}
