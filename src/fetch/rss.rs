//! RSS/Atom feed downloader.
//!
//! Feeds come from `<src>/rss.jsonl`, one [`FeedSource`] per line. Each feed
//! document is stored as fetched under its id; parsing is left to the
//! transform stage.

use super::{fetch_dir, http_client};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::FeedSource;
use crate::outputs::json::{RSS_ARTICLES_FILE, read_feed_sources};
use crate::retry::{RetryPolicy, get_bytes_with_retry};
use crate::utils::{ensure_writable_dir, write_out_file};
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Save today's copy of every configured feed. Returns the ids saved.
#[instrument(level = "info", skip_all, fields(src = %src.display(), dest = %dest.display()))]
pub async fn fetch_rss(src: &Path, dest: &Path, settings: &Settings) -> Result<Vec<String>> {
    let list = src.join(RSS_ARTICLES_FILE);
    let feeds = read_feed_sources(&list).await?;
    info!(count = feeds.len(), "Loaded feed list");

    let client = http_client()?;
    let dir = fetch_dir(dest, &Local::now());
    ensure_writable_dir(&dir).await?;

    let saved = fetch_feeds(&client, &feeds, &dir, settings.retry_policy()).await;
    info!(saved = saved.len(), feeds = feeds.len(), "Fetched feeds");
    Ok(saved)
}

async fn fetch_feeds(
    client: &reqwest::Client,
    feeds: &[FeedSource],
    dir: &Path,
    policy: RetryPolicy,
) -> Vec<String> {
    stream::iter(feeds)
        .then(|feed| async move {
            match fetch_feed(client, feed, dir, policy).await {
                Ok(()) => {
                    debug!(id = %feed.id, "Saved feed");
                    Some(feed.id.clone())
                }
                Err(e) => {
                    warn!(id = %feed.id, url = %feed.url, error = %e, "failed to fetch feed.");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await
}

async fn fetch_feed(client: &reqwest::Client, feed: &FeedSource, dir: &Path, policy: RetryPolicy) -> Result<()> {
    if feed.id.is_empty() || feed.id.contains(['/', '\\']) || feed.id == ".." {
        return Err(Error::Record(format!("invalid feed id {:?}", feed.id)));
    }
    let bytes = get_bytes_with_retry(client, &feed.url, policy).await?;
    write_out_file(&dir.join(&feed.id), &bytes).await
}
