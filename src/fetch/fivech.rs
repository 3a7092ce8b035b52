//! 5ch board scraper.
//!
//! The board list page (`bbstable.html`, Shift_JIS) links every board. Each
//! board's `subject.txt` lists its live threads and is saved untouched; the
//! transform stage decodes it later.
//!
//! # Board ids
//!
//! A board at `https://asahi.5ch.net/newsplus/` has id `newsplus`: the URL
//! path with its first two `/` removed.

use super::{fetch_dir, http_client};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::{Board, FetchInfo};
use crate::outputs::json::write_fetch_info;
use crate::retry::{RetryPolicy, get_bytes_with_retry};
use crate::utils::{ensure_writable_dir, rfc3339, write_out_file};
use chrono::Local;
use encoding_rs::SHIFT_JIS;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// An anchor on the board list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLink {
    pub text: String,
    pub href: String,
}

/// Save every board's subject file for today and record the boards.
///
/// # Arguments
///
/// * `dest` - root of the fetch tree; files go under today's `YYYYMMDD` directory
/// * `settings` - board list URL, excluded links and retry policy
///
/// # Returns
///
/// The boards whose subject file was saved. `fetch_info.json` lists them
/// and is only written when there is at least one.
///
/// # Errors
///
/// Failing to fetch the board list or to prepare the day directory ends the
/// stage. A board whose subject file cannot be fetched is skipped instead.
#[instrument(level = "info", skip_all, fields(dest = %dest.display()))]
pub async fn fetch_5ch(dest: &Path, settings: &Settings) -> Result<Vec<Board>> {
    let client = http_client()?;
    let policy = settings.retry_policy();

    let page = get_bytes_with_retry(&client, &settings.board_list_url, policy).await?;
    let (html, _, had_errors) = SHIFT_JIS.decode(&page);
    if had_errors {
        warn!(url = %settings.board_list_url, "Board list contains undecodable bytes");
    }
    let links = board_links(&html);
    info!(count = links.len(), source = %settings.board_list_url, "Indexed board links");

    let now = Local::now();
    let dir = fetch_dir(dest, &now);
    ensure_writable_dir(&dir).await?;

    let targets = select_boards(&links, &settings.excluded_board_links);
    let boards = fetch_boards(&client, &targets, &dir, policy).await;
    info!(boards = boards.len(), candidates = targets.len(), "Fetched subject files");

    if !boards.is_empty() {
        let info = FetchInfo {
            date: rfc3339(&now),
            boards: boards.clone(),
        };
        write_fetch_info(&dir, &info).await?;
    }
    Ok(boards)
}

async fn fetch_boards(
    client: &reqwest::Client,
    targets: &[&BoardLink],
    dir: &Path,
    policy: RetryPolicy,
) -> Vec<Board> {
    stream::iter(targets.iter().copied())
        .then(|link| async move {
            match fetch_board(client, link, dir, policy).await {
                Ok(board) => {
                    debug!(id = %board.id, "Saved subject file");
                    Some(board)
                }
                Err(e) => {
                    warn!(url = %link.href, error = %e, "failed to fetch subject.txt.");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await
}

async fn fetch_board(
    client: &reqwest::Client,
    link: &BoardLink,
    dir: &Path,
    policy: RetryPolicy,
) -> Result<Board> {
    let board_url = Url::parse(&link.href).map_err(|e| Error::Url {
        url: link.href.clone(),
        source: e,
    })?;
    let id = board_id(&board_url)?;
    let subject = subject_url(&board_url);

    let bytes = get_bytes_with_retry(client, subject.as_str(), policy).await?;
    write_out_file(&dir.join(&id), &bytes).await?;

    Ok(Board {
        id,
        name: link.text.clone(),
        url: link.href.clone(),
    })
}

/// Every `a[href]` of the board list page, in document order.
pub fn board_links(html: &str) -> Vec<BoardLink> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some(BoardLink {
                text: a.text().collect(),
                href: href.to_string(),
            })
        })
        .collect()
}

/// Links that may be boards: not excluded, each href once.
pub fn select_boards<'a>(links: &'a [BoardLink], excluded: &[String]) -> Vec<&'a BoardLink> {
    links
        .iter()
        .filter(|l| !excluded.iter().any(|x| x == &l.href))
        .unique_by(|l| l.href.as_str())
        .collect()
}

pub fn board_id(board_url: &Url) -> Result<String> {
    let id = board_url.path().replacen('/', "", 2);
    if id.is_empty() {
        return Err(Error::BoardUrl {
            url: board_url.to_string(),
        });
    }
    Ok(id)
}

/// `<board url>/subject.txt`
pub fn subject_url(board_url: &Url) -> Url {
    let mut url = board_url.clone();
    let path = format!("{}/subject.txt", board_url.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}
