//! JSON and JSON-lines files exchanged between stages.
//!
//! Every reader wraps failures with the path it was reading, and every
//! writer creates missing parent directories.

use crate::dates::format_date;
use crate::error::{Error, Result};
use crate::models::{Content, FeedSource, FetchInfo, NewsArticle};
use crate::transform::ArticleMap;
use crate::utils::{to_json_lines, write_out_file};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Name of the fetch snapshot inside a fetch day directory.
pub const FETCH_INFO_FILE: &str = "fetch_info.json";
/// Extracted 5ch threads inside a transform day directory.
pub const FIVECH_ARTICLES_FILE: &str = "5ch.jsonl";
/// Extracted feed entries inside a transform day directory. The configured
/// feed list uses the same name at the root of the fetch directory.
pub const RSS_ARTICLES_FILE: &str = "rss.jsonl";

/// `<dir>/<YYYYMMDD>`
pub fn day_dir(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format_date(date))
}

/// Parse one JSON value per non-blank line.
pub fn parse_json_lines<T: DeserializeOwned>(text: &str, path: &Path) -> Result<Vec<T>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| Error::json_at("could not unmarshal line", path, e))
        })
        .collect()
}

async fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_at("failed to open file", path, e))?;
    parse_json_lines(&text, path)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| Error::io_at("failed to read file", path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::json_at("failed to unmarshal json", path, e))
}

/// Write `articles` to `<dest>/<YYYYMMDD>/<file_name>`, one JSON object per line.
///
/// An empty map writes nothing at all, not even the day directory, so a day
/// without articles leaves no artifact. Returns whether a file was written.
#[instrument(level = "info", skip_all, fields(dest = %dest.display(), %date, %file_name, count = articles.len()))]
pub async fn write_articles(
    dest: &Path,
    date: NaiveDate,
    file_name: &str,
    articles: &ArticleMap,
) -> Result<bool> {
    if articles.is_empty() {
        info!("No articles for this day; skipping write");
        return Ok(false);
    }
    let path = day_dir(dest, date).join(file_name);
    let body = to_json_lines(articles.iter())?;
    write_out_file(&path, body.as_bytes()).await?;
    info!(path = %path.display(), "Wrote articles");
    Ok(true)
}

/// Read a JSON-lines article file.
pub async fn read_articles(path: &Path) -> Result<Vec<NewsArticle>> {
    let articles = read_json_lines(path).await?;
    debug!(path = %path.display(), count = articles.len(), "Read articles");
    Ok(articles)
}

/// Read the configured feed list (JSON lines of `{id, name, url}`).
pub async fn read_feed_sources(path: &Path) -> Result<Vec<FeedSource>> {
    read_json_lines(path).await
}

/// Read `<dir>/fetch_info.json`.
pub async fn read_fetch_info(dir: &Path) -> Result<FetchInfo> {
    read_json(&dir.join(FETCH_INFO_FILE)).await
}

/// Write `<dir>/fetch_info.json`.
pub async fn write_fetch_info(dir: &Path, info: &FetchInfo) -> Result<()> {
    let path = dir.join(FETCH_INFO_FILE);
    let json = serde_json::to_vec(info)
        .map_err(|e| Error::json_at("failed to write json", &path, e))?;
    write_out_file(&path, &json).await
}

/// `<dir>/<YYYYMMDD>.json`
pub fn content_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.json", format_date(date)))
}

/// Write a day's digest to `<dest>/<YYYYMMDD>.json`.
#[instrument(level = "info", skip_all, fields(dest = %dest.display(), %date))]
pub async fn write_content(dest: &Path, date: NaiveDate, content: &Content) -> Result<PathBuf> {
    let path = content_path(dest, date);
    let json = serde_json::to_vec(content)
        .map_err(|e| Error::json_at("failed to write json", &path, e))?;
    write_out_file(&path, &json).await?;
    info!(path = %path.display(), items = content.items.len(), "Wrote content");
    Ok(path)
}

/// Read a day's digest.
pub async fn read_content(path: &Path) -> Result<Content> {
    read_json(path).await
}
