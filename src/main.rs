//! Letter Harvester main entry point
//!
//! This is the command-line interface and periodic trigger of the harvester.

use clap::Parser;
use letter_harvester::config::{load_config_with_hash, Config};
use letter_harvester::crawler::{harvest, listing_url};
use letter_harvester::output::print_report;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

/// Letter Harvester: an incremental crawler for a letters archive
///
/// Walks the archive's listing pages newest-first and stores every letter it
/// has not seen yet. Runs once at startup and then on a fixed interval until
/// interrupted.
#[derive(Parser, Debug)]
#[command(name = "letter-harvester")]
#[command(version)]
#[command(about = "An incremental letter archive harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single harvest and exit instead of repeating on the interval
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "once"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "once"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.once {
        let report = harvest(&config, &config_hash).await?;
        if !cli.quiet {
            print_report(&report);
        }
    } else {
        handle_schedule(&config, &config_hash).await;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("letter_harvester=info,warn"),
            1 => EnvFilter::new("letter_harvester=debug,info"),
            2 => EnvFilter::new("letter_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Letter Harvester Dry Run ===\n");

    let base_url = url::Url::parse(&config.archive.base_url)?;
    let first_page = listing_url(&base_url, 1, config.archive.page_size);

    println!("Archive:");
    println!("  Base URL: {}", config.archive.base_url);
    println!("  First listing page: {}", first_page);
    println!("  Page size: {}", config.archive.page_size);
    println!("  Target count: {}", config.archive.target_count);

    println!("\nFetcher:");
    println!("  Renderer: {:?}", config.fetcher.renderer);
    if !config.fetcher.renderer.runs_scripts() {
        println!("  (detail views are fetched without running scripts)");
    }
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!(
        "  Backoff: {}ms - {}ms",
        config.fetcher.initial_backoff_ms, config.fetcher.max_backoff_ms
    );
    println!(
        "  Navigation timeout: {}ms",
        config.fetcher.navigation_timeout_ms
    );

    println!("\nCrawler:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );

    println!("\nSchedule:");
    println!("  Interval: {}h", config.schedule.interval_hours);
    println!("  Run on start: {}", config.schedule.run_on_start);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use letter_harvester::output::{load_statistics, print_statistics};
    use letter_harvester::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Runs harvests on the configured interval until Ctrl-C
///
/// A failed run is logged and the next one is still scheduled. An interrupt
/// received during a run takes effect once that run has finished.
async fn handle_schedule(config: &Config, config_hash: &str) {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received, stopping after the current run"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = stop_tx.send(true);
    });

    if config.schedule.run_on_start {
        run_scheduled(config, config_hash).await;
    }

    let period = config.schedule.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(
        "Next harvest in {} hours",
        config.schedule.interval_hours
    );

    loop {
        if *stop_rx.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => run_scheduled(config, config_hash).await,
            _ = stop_rx.changed() => break,
        }
    }

    tracing::info!("Harvester stopped");
}

async fn run_scheduled(config: &Config, config_hash: &str) {
    match harvest(config, config_hash).await {
        Ok(report) => tracing::info!(
            "Scheduled harvest completed: {} new letters, {} stored",
            report.persisted,
            report.final_count
        ),
        Err(e) => tracing::error!("Scheduled harvest failed: {}", e),
    }
}
