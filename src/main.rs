//! namer CLI - Score candidate given names and curate a shortlist.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use namer::pipeline::scoring_progress_bar;
use namer::{Config, ScoreClient, ScoreOutcome, ScoringDriver, Session, StdinPrompter};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "namer")]
#[command(version)]
#[command(about = "Score candidate given names against a naming service and curate a shortlist")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of score buckets to report
    #[arg(long, default_value = "10")]
    top: usize,

    /// Skip the interactive curation pass
    #[arg(long)]
    no_curate: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {e}");
    }
}

fn print_example_config() {
    let example = r#"{
  "last_name": "王",
  "year": 2019,
  "month": 3,
  "day": 7,
  "hour": 8,
  "minute": 30,
  "gender": 0,
  "first_name_key_words": "明,华,强,子,涵,宇,轩",
  "min_candidate_score": 90,
  "request_delay_ms": 300,
  "timeout_secs": 30,
  "pair_rule": "full"
}"#;
    println!("{example}");
}

fn require_config(path: Option<&Path>) -> Result<&Path> {
    path.context("A config file is required: namer -c <config file>")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Some(Commands::Example) => {
            print_example_config();
            return Ok(());
        }

        Some(Commands::Validate) => {
            let path = require_config(cli.config.as_deref())?;
            let config = Config::from_file(path)
                .with_context(|| format!("Failed to load config from {path:?}"))?;
            let alphabet = config.alphabet();

            info!("Configuration is valid");
            info!("  Surname: {}", config.last_name);
            info!(
                "  Birth: {}-{:02}-{:02} {:02}:{:02}",
                config.year, config.month, config.day, config.hour, config.minute
            );
            info!(
                "  Alphabet: {} ({} characters)",
                alphabet.iter().collect::<String>(),
                alphabet.len()
            );
            info!("  Pair rule: {:?}", config.pair_rule);
            info!("  Curation threshold: {}", config.min_candidate_score);
            return Ok(());
        }

        None => {}
    }

    let path = require_config(cli.config.as_deref())?;
    let mut session = Session::open(path)
        .with_context(|| format!("Failed to open session for {path:?}"))?;

    let client = ScoreClient::new(session.config()).context("Failed to create scoring client")?;
    let total = ScoringDriver::new(&client, session.alphabet(), session.config().pair_rule)
        .total_lookups();

    let shutdown = namer::shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = session
        .score(&client, shutdown.as_mut(), scoring_progress_bar(total))
        .await
        .context("Failed to save score snapshot")?;

    let throttle = client.throttle().stats();
    println!("\n=== Scoring ===");
    match &outcome {
        ScoreOutcome::Completed(stats) => {
            println!("Status:      complete");
            println!("Fetched:     {}", stats.fetched);
            println!("Cached:      {}", stats.cached);
        }
        ScoreOutcome::Failed(e) => println!("Status:      aborted ({e})"),
        ScoreOutcome::Interrupted => println!("Status:      interrupted"),
    }
    println!("Scored:      {}", session.tree().len());
    println!("Requests:    {}", throttle.total_requests);
    println!("Paced:       {:.1}s", throttle.total_wait_secs);
    println!("Snapshot:    {:?}\n", session.store().score_path());

    session.report(cli.top)?;

    if outcome.is_interrupted() {
        warn!("Interrupted, skipping curation");
    } else if !cli.no_curate {
        let mut prompter = StdinPrompter::spawn()?;
        let curated = session
            .curate(&mut prompter, shutdown.as_mut())
            .await
            .context("Failed to save curation results")?;
        if curated.is_none() {
            warn!("Curation interrupted");
        }
    } else {
        session.save().context("Failed to save snapshots")?;
    }

    session.print_candidates()?;
    Ok(())
}
