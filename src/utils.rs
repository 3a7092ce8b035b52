//! Small helpers for dates, log output and the file system.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Local midnight at the start of `date`.
pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// RFC3339 with second precision, e.g. `2024-01-02T00:00:00+09:00`.
pub fn rfc3339<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYY/MM/DD`, the display form of a day.
pub fn slash_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Truncate a string for logging purposes.
///
/// Keeps at most `max` characters and appends how many bytes were cut.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory, then writes and removes an empty marker file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_at("failed to create directory", path, e))?;
    let marker = path.join(".nahaha_write_check");
    fs::write(&marker, b"")
        .await
        .map_err(|e| Error::io_at("directory is not writable", path, e))?;
    if let Err(e) = fs::remove_file(&marker).await {
        debug!(path = %marker.display(), error = %e, "Could not remove write check file");
    }
    info!("Output directory is writable");
    Ok(())
}

/// Create (truncating) `path` and its parent directories, then write `bytes`.
pub async fn write_out_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io_at("failed to create output directory", dir, e))?;
    }
    fs::write(path, bytes)
        .await
        .map_err(|e| Error::io_at("failed to write file", path, e))
}

/// Serialize each value as one JSON line.
pub fn to_json_lines<'a, T, I>(values: I) -> Result<String>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = String::new();
    for v in values {
        let line = serde_json::to_string(v).map_err(|e| Error::Json {
            context: "could not marshal".to_string(),
            source: e,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
