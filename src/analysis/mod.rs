//! Analysis stage: turn a day's extracted articles into a ranked digest.
//!
//! Reads `<src>/<YYYYMMDD>/rss.jsonl` and `5ch.jsonl`, ranks the person names
//! in their titles, keeps the top `max_content_items` and writes
//! `<dest>/<YYYYMMDD>.json`.

use crate::config::Settings;
use crate::dates::format_date;
use crate::error::Result;
use crate::models::{Content, NewsArticle};
use crate::outputs::json::{FIVECH_ARTICLES_FILE, RSS_ARTICLES_FILE, day_dir, read_articles, write_content};
use crate::utils::{local_midnight, rfc3339, slash_date};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, instrument, warn};

pub mod ranking;
pub mod tokenizer;

use ranking::{StopList, rank};
use tokenizer::{MecabTokenizer, Tokenizer};

/// Article files read for one day, in this order.
const ARTICLE_FILES: [&str; 2] = [RSS_ARTICLES_FILE, FIVECH_ARTICLES_FILE];

/// Limits applied when building a digest.
#[derive(Debug, Clone)]
pub struct TrendOptions {
    pub stop_list: StopList,
    pub max_ranked_terms: usize,
    pub max_content_items: usize,
}

impl TrendOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            stop_list: StopList::new(settings.all_stop_words()),
            max_ranked_terms: settings.max_ranked_terms,
            max_content_items: settings.max_content_items,
        }
    }
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Run the analysis for `date` with a MeCab process started for this day.
///
/// The process is closed when ranking succeeds and killed when any step
/// fails.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn analyze_trends(src: &Path, dest: &Path, date: NaiveDate, settings: &Settings) -> Result<()> {
    let mut tokenizer = MecabTokenizer::spawn(&settings.mecab_command, &settings.mecab_dicdir).await?;
    let options = TrendOptions::from_settings(settings);
    transform_trends(src, dest, date, &mut tokenizer, &options).await?;
    tokenizer.close().await
}

/// Build and write the digest for `date` using `tokenizer`.
pub async fn transform_trends<T: Tokenizer>(
    src: &Path,
    dest: &Path,
    date: NaiveDate,
    tokenizer: &mut T,
    options: &TrendOptions,
) -> Result<Content> {
    let articles = read_day_articles(src, date).await;
    info!(date = %format_date(date), count = articles.len(), stop_words = options.stop_list.len(), "Loaded articles");

    let mut items = rank(&articles, tokenizer, &options.stop_list, options.max_ranked_terms).await?;
    items.truncate(options.max_content_items);

    let content = Content {
        format_date: slash_date(date),
        date: rfc3339(&local_midnight(date)),
        items,
    };
    write_content(dest, date, &content).await?;
    Ok(content)
}

/// Every article file of the day that could be read.
async fn read_day_articles(src: &Path, date: NaiveDate) -> Vec<NewsArticle> {
    let dir = day_dir(src, date);
    let mut articles = Vec::new();
    for name in ARTICLE_FILES {
        let path = dir.join(name);
        match read_articles(&path).await {
            Ok(mut a) => articles.append(&mut a),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to open JSONL file."),
        }
    }
    articles
}
