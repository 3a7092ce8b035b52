//! # nahaha
//!
//! A daily trend pipeline over Japanese news feeds and 5ch thread titles.
//! It finds the person names mentioned most often on a given day and
//! publishes them as a Markdown post.
//!
//! ## Usage
//!
//! ```sh
//! nahaha fetch 5ch --dest ./raw
//! nahaha transform 5ch --src ./raw --dest ./articles --date 20240102
//! nahaha analysis trends --src ./articles --dest ./trends --date 20240102
//! nahaha publish trends --src ./trends --dest ./posts --date 20240102
//! ```
//!
//! ## Architecture
//!
//! Four stages, each reading the previous stage's directory tree:
//! 1. **Fetch**: save today's 5ch subject files and RSS documents
//! 2. **Transform**: extract each date's articles, deduplicated by URL
//! 3. **Analysis**: tokenize titles with MeCab and rank person names
//! 4. **Publish**: render the ranking as a Markdown post
//!
//! Date-driven stages accept one date or a range; a range keeps going past a
//! failing date and reports every failure at the end. A MeCab failure stops
//! the range at once.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod cli;
mod config;
mod dates;
mod error;
mod fetch;
mod models;
mod outputs;
mod publish;
mod retry;
mod transform;
mod utils;

use cli::{AnalysisCommand, Cli, Command, DateArgs, FetchCommand, PublishCommand, TransformCommand};
use config::Settings;
use dates::each_by_period;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let argv: Vec<String> = std::env::args().collect();
    info!(command = %argv.join(" "), "nahaha starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if let Err(e) = run(args).await {
        if let error::Error::Aggregate(agg) = &e {
            for inner in agg.errors() {
                error!(error = %inner, "Date failed");
            }
        }
        error!(error = %e, "Command failed");
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run(args: Cli) -> error::Result<()> {
    let settings = Settings::load(args.config.as_deref()).await?;
    let settings = &settings;

    match args.command {
        Command::Fetch(FetchCommand::Fivech { dest }) => {
            let boards = fetch::fivech::fetch_5ch(&dest, settings).await?;
            info!(boards = boards.len(), "Fetched 5ch");
        }
        Command::Fetch(FetchCommand::Rss { src, dest }) => {
            let feeds = fetch::rss::fetch_rss(&src, &dest, settings).await?;
            info!(feeds = feeds.len(), "Fetched RSS");
        }
        Command::Transform(TransformCommand::Fivech(a)) => {
            let (src, dest) = dirs(&a);
            each_by_period(a.period, &a.date, move |d| transform::fivech::transform_5ch(src, dest, d)).await?;
        }
        Command::Transform(TransformCommand::Rss(a)) => {
            let (src, dest) = dirs(&a);
            each_by_period(a.period, &a.date, move |d| transform::rss::transform_rss(src, dest, d)).await?;
        }
        Command::Analysis(AnalysisCommand::Trends(a)) => {
            let (src, dest) = dirs(&a);
            each_by_period(a.period, &a.date, move |d| {
                analysis::analyze_trends(src, dest, d, settings)
            })
            .await?;
        }
        Command::Publish(PublishCommand::Trends(a)) => {
            let (src, dest) = dirs(&a);
            each_by_period(a.period, &a.date, move |d| async move {
                publish::publish_trends(src, dest, d).await.map(|_| ())
            })
            .await?;
        }
    }
    Ok(())
}

fn dirs(a: &DateArgs) -> (&Path, &Path) {
    (a.src.as_path(), a.dest.as_path())
}
