//! Publish stage: render a day's digest as a Markdown post.
//!
//! Reads `<src>/<YYYYMMDD>.json` written by the analysis stage and writes
//! `<dest>/YYYY/MM/DD.md`. A digest without items is an error rather than an
//! empty post.

use crate::dates::format_date;
use crate::error::{Error, Result};
use crate::outputs::json::{content_path, read_content};
use crate::outputs::markdown::{content_to_markdown, post_path};
use crate::utils::write_out_file;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[instrument(level = "info", skip_all, fields(src = %src.display(), dest = %dest.display(), %date))]
pub async fn publish_trends(src: &Path, dest: &Path, date: NaiveDate) -> Result<PathBuf> {
    let content = read_content(&content_path(src, date)).await?;
    if content.items.is_empty() {
        return Err(Error::EmptyContent {
            date: format_date(date),
        });
    }

    let md = content_to_markdown(&content)?;
    let path = post_path(dest, date);
    write_out_file(&path, md.as_bytes()).await?;
    info!(path = %path.display(), items = content.items.len(), "Wrote post");
    Ok(path)
}
