//! Command-line interface definitions for nahaha.
//!
//! One subcommand group per pipeline stage, one subcommand per source:
//!
//! ```sh
//! nahaha fetch 5ch --dest ~/nahaha/raw
//! nahaha fetch rss --src ~/nahaha/conf --dest ~/nahaha/raw
//! nahaha transform 5ch --src ~/nahaha/raw --dest ~/nahaha/articles --date 20240101,20240107
//! nahaha analysis trends --src ~/nahaha/articles --dest ~/nahaha/trends --date 20240102
//! nahaha publish trends --src ~/nahaha/trends --dest ~/site/content/posts --date 20240102
//! ```

use crate::dates::Period;
use crate::utils::expand_home;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DIR: &str = "~/Desktop";

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "NAHAHA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download today's raw sources
    #[command(subcommand)]
    Fetch(FetchCommand),

    /// Extract the articles of each date from the raw sources
    #[command(subcommand)]
    Transform(TransformCommand),

    /// Rank the person names in each date's articles
    #[command(subcommand)]
    Analysis(AnalysisCommand),

    /// Render each date's ranking as a Markdown post
    #[command(subcommand)]
    Publish(PublishCommand),
}

#[derive(Subcommand, Debug)]
pub enum FetchCommand {
    /// Fetch every 5ch board's subject.txt
    #[command(name = "5ch")]
    Fivech {
        /// Directory to save the fetched files in
        #[arg(long, default_value = DEFAULT_DIR, value_parser = parse_dir)]
        dest: PathBuf,
    },

    /// Fetch every feed listed in <src>/rss.jsonl
    Rss {
        /// Directory holding rss.jsonl
        #[arg(long, default_value = DEFAULT_DIR, value_parser = parse_dir)]
        src: PathBuf,

        /// Directory to save the fetched files in
        #[arg(long, default_value = DEFAULT_DIR, value_parser = parse_dir)]
        dest: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransformCommand {
    /// Extract 5ch threads updated on each date
    #[command(name = "5ch")]
    Fivech(DateArgs),

    /// Extract feed entries published on each date
    Rss(DateArgs),
}

#[derive(Subcommand, Debug)]
pub enum AnalysisCommand {
    /// Rank the day's person names
    Trends(DateArgs),
}

#[derive(Subcommand, Debug)]
pub enum PublishCommand {
    /// Write the day's ranking as a post
    Trends(DateArgs),
}

/// Options shared by every date-driven stage.
#[derive(Args, Debug, Clone)]
pub struct DateArgs {
    /// Input directory
    #[arg(long, default_value = DEFAULT_DIR, value_parser = parse_dir)]
    pub src: PathBuf,

    /// Output directory
    #[arg(long, default_value = DEFAULT_DIR, value_parser = parse_dir)]
    pub dest: PathBuf,

    /// Target date, or the first and last date of a range (YYYYMMDD)
    #[arg(long, required = true, num_args = 1..=2, value_delimiter = ',')]
    pub date: Vec<String>,

    /// Step between dates of a range
    #[arg(long, default_value_t = Period::Daily)]
    pub period: Period,
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    if s.trim().is_empty() {
        return Err("directory must not be empty".to_string());
    }
    Ok(expand_home(s))
}
