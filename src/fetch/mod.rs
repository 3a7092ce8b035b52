//! Fetch stage: download the raw sources of one day.
//!
//! | Source | Module | Input | Output under `<dest>/<today>/` |
//! |--------|--------|-------|--------------------------------|
//! | 5ch | [`fivech`] | board list page | `<board id>` subject files, `fetch_info.json` |
//! | RSS | [`rss`] | `<src>/rss.jsonl` feed list | `<feed id>` feed documents |
//!
//! Every request goes through [`crate::retry`]. Sources are fetched one after
//! another; a single failing board or feed is logged and skipped.

use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub mod fivech;
pub mod rss;

const USER_AGENT: &str = concat!("nahaha/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by one fetch run.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// `<dest>/<YYYYMMDD of now>`
pub fn fetch_dir(dest: &Path, now: &DateTime<Local>) -> PathBuf {
    dest.join(now.format(crate::dates::DATE_FORMAT).to_string())
}
