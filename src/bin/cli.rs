//! rentwatch CLI
//!
//! Local execution entry point: scheduled runs, one-off crawls and
//! summaries, and store inspection.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rentwatch::{
    config::{load_config, storage_dir},
    error::Result,
    models::Config,
    notifier::{BitlyShortener, Dispatcher, EmailChannel, SmsChannel},
    pipeline::{CrawlPipeline, Scheduler},
    services::HttpFetcher,
    storage::{LocalStorage, ProfileStore, store_stats},
    utils::http,
};

/// rentwatch - Rental Classifieds Watcher
#[derive(Parser, Debug)]
#[command(
    name = "rentwatch",
    version,
    about = "Watches rental classifieds and notifies subscribers"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage directory (overrides storage.dir from the config)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until interrupted
    Run,

    /// Crawl once and notify subscribers about new listings
    Crawl,

    /// Send the daily summary once
    Summary,

    /// Validate the configuration file
    Validate,

    /// Show store statistics
    Info,
}

/// Initialize logging from the config level, or debug when verbose.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Wire the pipeline from configuration.
fn build_pipeline(config: Arc<Config>, storage: Arc<LocalStorage>) -> Result<CrawlPipeline> {
    let client = http::create_async_client(&config.crawler)?;
    let fetcher = Arc::new(HttpFetcher::with_client(client.clone()));

    let dispatcher = Dispatcher::new(config.notify.max_concurrent_sends)
        .with_channel(Arc::new(EmailChannel::new(
            client.clone(),
            config.notify.email.clone(),
        )))
        .with_channel(Arc::new(SmsChannel::new(
            client.clone(),
            config.notify.sms.clone(),
        )));

    let mut pipeline = CrawlPipeline::new(
        Arc::clone(&config),
        fetcher,
        storage.clone(),
        storage,
        dispatcher,
    )?;
    if let Some(shortener) = &config.notify.shortener {
        pipeline = pipeline.with_shortener(Arc::new(BitlyShortener::new(client, shortener.clone())));
    }
    Ok(pipeline)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config, cli.verbose);

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!(
            "No configuration at {}, using defaults",
            cli.config.display()
        );
    }

    let root = storage_dir(&config, cli.storage_dir.as_deref());
    let storage = Arc::new(LocalStorage::new(&root));
    let config = Arc::new(config);

    match cli.command {
        Command::Run => {
            let pipeline = build_pipeline(Arc::clone(&config), storage)?;
            Scheduler::new(config.schedule.clone()).run(&pipeline).await;
        }

        Command::Crawl => {
            let pipeline = build_pipeline(Arc::clone(&config), storage)?;
            let stats = pipeline.run().await?;
            log::info!(
                "Crawl complete: {} new listings, {} subscribers notified about {}",
                stats.inserted,
                stats.matched_profiles,
                stats.notified
            );
        }

        Command::Summary => {
            let pipeline = build_pipeline(Arc::clone(&config), storage)?;
            let stats = pipeline.run_summary().await?;
            log::info!(
                "Summary complete: {} sent, {} failed",
                stats.sends_succeeded,
                stats.sends_failed
            );
        }

        Command::Validate => {
            // load_config has already validated; reaching here means it passed.
            log::info!("✓ Config OK");
            log::info!("  Index URL: {}", config.crawler.page_url(config.crawler.first_page));
            log::info!(
                "  Email: {}, SMS: {}, Shortener: {}",
                on_off(config.notify.email.enabled),
                on_off(config.notify.sms.enabled),
                on_off(config.notify.shortener.is_some())
            );
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", root.display());
            let stats = store_stats(storage.as_ref()).await?;
            log::info!(
                "Listings: {} total, {} live, {} disabled, {} notified",
                stats.total,
                stats.live,
                stats.disabled,
                stats.notified
            );
            let profiles = storage.load_profiles().await?;
            log::info!("Subscriber profiles: {}", profiles.len());
        }
    }

    log::info!("Done!");

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
