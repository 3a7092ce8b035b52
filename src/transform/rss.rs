//! RSS/Atom entry extraction.
//!
//! The feed list `<src>/rss.jsonl` names every configured feed; a fetch run
//! saves each one as `<src>/<YYYYMMDD>/<feed id>`. A feed that is missing,
//! unreadable or unparseable is skipped so the other feeds still count.

use super::ArticleMap;
use crate::error::Result;
use crate::models::{FeedSource, NewsArticle};
use crate::outputs::json::{RSS_ARTICLES_FILE, day_dir, read_feed_sources, write_articles};
use crate::utils::{local_midnight, rfc3339};
use chrono::{DateTime, Local, NaiveDate};
use feed_rs::model::Feed;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Extract the feed entries published on `date` and write them to
/// `<dest>/<YYYYMMDD>/rss.jsonl`.
#[instrument(level = "info", skip_all, fields(src = %src.display(), dest = %dest.display(), %date))]
pub async fn transform_rss(src: &Path, dest: &Path, date: NaiveDate) -> Result<()> {
    let feed_list = src.join(RSS_ARTICLES_FILE);
    let feeds = read_feed_sources(&feed_list).await?;

    let articles = article_map(&feeds, src, date).await;
    write_articles(dest, date, RSS_ARTICLES_FILE, &articles).await?;
    Ok(())
}

/// Entries of every configured feed whose effective date is `date`.
pub async fn article_map(feeds: &[FeedSource], src: &Path, date: NaiveDate) -> ArticleMap {
    let dir = day_dir(src, date);
    let mut articles = ArticleMap::new();

    for source in feeds {
        let path = dir.join(&source.id);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            // the feed list changed after this day was fetched
            _ => {
                debug!(path = %path.display(), "No fetched feed file; skipping");
                continue;
            }
        }

        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open RSS file.");
                continue;
            }
        };
        let feed = match feed_rs::parser::parse(bytes.as_slice()) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse RSS.");
                continue;
            }
        };

        let added = extract_entries(&mut articles, source, feed, date);
        debug!(feed = %source.id, added, "Extracted feed entries");
    }

    info!(count = articles.len(), "Extracted RSS articles");
    articles
}

/// Add the entries of `feed` whose effective date is `date`. Returns how many
/// were added.
pub fn extract_entries(
    articles: &mut ArticleMap,
    source: &FeedSource,
    feed: Feed,
    date: NaiveDate,
) -> usize {
    let feed_name = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| source.name.clone());

    let mut added = 0;
    for entry in feed.entries {
        let Some(url) = entry.links.first().map(|l| l.href.clone()).filter(|u| !u.is_empty())
        else {
            warn!(feed = %source.id, entry_id = %entry.id, "entry has no link; skipping");
            continue;
        };
        if articles.contains(&url) {
            continue;
        }

        let published = entry
            .published
            .or(entry.updated)
            .map(|d| d.with_timezone(&Local));
        let effective = effective_date(published, date);
        if effective.date_naive() != date {
            continue;
        }

        let title = entry.title.map(|t| t.content).unwrap_or_default();
        if !NewsArticle::title_fits(&title) {
            debug!(%url, "title too long; skipping");
            continue;
        }

        if articles.insert_if_absent(NewsArticle {
            date: rfc3339(&effective),
            url,
            name: feed_name.clone(),
            title,
        }) {
            added += 1;
        }
    }
    added
}

/// Published time, else updated time, else the start of the target day.
fn effective_date(published: Option<DateTime<Local>>, date: NaiveDate) -> DateTime<Local> {
    published.unwrap_or_else(|| local_midnight(date))
}
