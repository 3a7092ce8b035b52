//! 5ch thread extraction.
//!
//! A fetch run saves one `subject.txt` listing per board. Each line of a
//! listing describes one thread:
//!
//! ```text
//! 1704164400.dat<>スレッドタイトル [無断転載禁止]&#169;2ch.net (123)
//! ```
//!
//! The thread key is the creation time in Unix seconds, so it both selects
//! the threads of the target day and forms the thread URL. Titles are
//! Shift_JIS encoded.

use super::ArticleMap;
use crate::dates::format_date;
use crate::error::{Error, Result};
use crate::models::{Board, NewsArticle};
use crate::outputs::json::{FIVECH_ARTICLES_FILE, day_dir, read_fetch_info, write_articles};
use crate::utils::{rfc3339, truncate_for_log};
use chrono::{Local, NaiveDate, TimeZone};
use encoding_rs::SHIFT_JIS;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Field separator of a subject listing line.
const FIELD_SEPARATOR: &[u8] = b"<>";

/// Boilerplate removed from thread titles.
const TITLE_BOILERPLATE: &[&str] = &[
    "&#169;2ch.net",
    "&copy;2ch.net",
    "&#169;bbspink.com",
    "&copy;bbspink.com",
    "[無断転載禁止]",
    "[転載禁止]",
];

/// Extract the threads created on `date` and write them to
/// `<dest>/<YYYYMMDD>/5ch.jsonl`.
#[instrument(level = "info", skip_all, fields(src = %src.display(), dest = %dest.display(), %date))]
pub async fn transform_5ch(src: &Path, dest: &Path, date: NaiveDate) -> Result<()> {
    let threads = thread_map(src, date).await?;
    write_articles(dest, date, FIVECH_ARTICLES_FILE, &threads).await?;
    Ok(())
}

/// Threads created on `date`, read from the boards listed in that day's
/// `fetch_info.json`.
///
/// A missing snapshot or subject file fails the whole day; malformed lines
/// are logged and skipped.
pub async fn thread_map(src: &Path, date: NaiveDate) -> Result<ArticleMap> {
    let dir = day_dir(src, date);
    let fetch_info = read_fetch_info(&dir).await?;
    info!(boards = fetch_info.boards.len(), dir = %dir.display(), "Read fetch info");

    let mut threads = ArticleMap::new();
    for board in &fetch_info.boards {
        let path = dir.join(&board.id);
        let listing = fs::read(&path)
            .await
            .map_err(|e| Error::io_at("failed to read file", &path, e))?;
        let added = extract_threads(&mut threads, board, &listing, date);
        debug!(board = %board.id, added, "Extracted board threads");
    }

    info!(
        date = %format_date(date),
        count = threads.len(),
        "Extracted 5ch threads"
    );
    Ok(threads)
}

/// Add the threads of `listing` created on `date` to `threads`. Returns how
/// many were added.
pub fn extract_threads(
    threads: &mut ArticleMap,
    board: &Board,
    listing: &[u8],
    date: NaiveDate,
) -> usize {
    let mut added = 0;
    for line in listing.split(|b| *b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if let Some(article) = parse_line(threads, board, line, date) {
            if threads.insert_if_absent(article) {
                added += 1;
            }
        }
    }
    added
}

fn parse_line(
    threads: &ArticleMap,
    board: &Board,
    line: &[u8],
    date: NaiveDate,
) -> Option<NewsArticle> {
    let fields = split_fields(line);
    let [key_field, title_field] = fields.as_slice() else {
        warn!(
            line = %truncate_for_log(&String::from_utf8_lossy(line), 120),
            "unexpected string"
        );
        return None;
    };

    let key = match std::str::from_utf8(key_field) {
        Ok(s) => thread_key(s),
        Err(e) => {
            warn!(error = %e, "unexpected thread key encoding");
            return None;
        }
    };
    let created = match key.parse::<i64>().ok().and_then(|secs| Local.timestamp_opt(secs, 0).single()) {
        Some(t) => t,
        None => {
            warn!(thread_key = %key, "unexpected thread key");
            return None;
        }
    };
    if created.date_naive() != date {
        return None;
    }

    let url = match thread_url(&board.url, &board.id, key) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = %board.url, id = %board.id, thread_key = %key, error = %e, "failed to generate thread URL");
            return None;
        }
    };
    if threads.contains(&url) {
        return None;
    }

    let title = match thread_title(title_field) {
        Ok(t) => t,
        Err(e) => {
            warn!(%url, error = %e, "failed to generate thread title");
            return None;
        }
    };
    if !NewsArticle::title_fits(&title) {
        debug!(%url, "title too long; skipping");
        return None;
    }

    Some(NewsArticle {
        date: rfc3339(&created),
        url,
        name: board.name.clone(),
        title,
    })
}

/// Split a listing line on every `<>`.
fn split_fields(line: &[u8]) -> Vec<&[u8]> {
    let mut fields = Vec::new();
    let mut rest = line;
    while let Some(i) = rest
        .windows(FIELD_SEPARATOR.len())
        .position(|w| w == FIELD_SEPARATOR)
    {
        fields.push(&rest[..i]);
        rest = &rest[i + FIELD_SEPARATOR.len()..];
    }
    fields.push(rest);
    fields
}

/// The thread key of a `<key>.dat` field.
pub fn thread_key(field: &str) -> &str {
    match field.rfind(".dat") {
        Some(i) => &field[..i],
        None => field,
    }
}

/// Decode a Shift_JIS title, cut the trailing reply count, drop boilerplate
/// and trim.
pub fn thread_title(raw: &[u8]) -> Result<String> {
    let decoded = SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(raw)
        .ok_or_else(|| {
            Error::Record(format!(
                "failed to decode thread title as Shift_JIS: {}",
                truncate_for_log(&String::from_utf8_lossy(raw), 80)
            ))
        })?;
    Ok(clean_title(&decoded))
}

fn clean_title(title: &str) -> String {
    let mut title = match title.rfind('(') {
        Some(i) => &title[..i],
        None => title,
    }
    .to_string();
    for w in TITLE_BOILERPLATE {
        title = title.replacen(w, "", 1);
    }
    title.trim().to_string()
}

/// `https://host/<id>/` becomes `https://host/test/read.cgi/<id>/<key>/`.
pub fn thread_url(board_url: &str, board_id: &str, key: &str) -> Result<String> {
    let i = board_url
        .rfind(board_id)
        .ok_or_else(|| Error::Record(format!("unexpected thread URL : {board_url}")))?;
    Ok(format!("{}test/read.cgi/{}/{}/", &board_url[..i], board_id, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchInfo;
    use crate::outputs::json::write_fetch_info;

    fn sjis(s: &str) -> Vec<u8> {
        SHIFT_JIS.encode(s).0.into_owned()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key_at(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap()
            .timestamp()
    }

    fn board() -> Board {
        Board {
            id: "newsplus".to_string(),
            name: "ニュース速報+".to_string(),
            url: "https://asahi.5ch.net/newsplus/".to_string(),
        }
    }

    #[test]
    fn test_thread_key() {
        assert_eq!(thread_key("1704164400.dat"), "1704164400");
        assert_eq!(thread_key("1704164400"), "1704164400");
    }

    #[test]
    fn test_thread_url() {
        assert_eq!(
            thread_url("https://asahi.5ch.net/newsplus/", "newsplus", "1704164400").unwrap(),
            "https://asahi.5ch.net/test/read.cgi/newsplus/1704164400/"
        );
        assert!(matches!(
            thread_url("https://asahi.5ch.net/other/", "newsplus", "1"),
            Err(Error::Record(_))
        ));
    }

    #[test]
    fn test_thread_title_cleanup() {
        let raw = sjis("【速報】山田太郎が会見 [無断転載禁止]&#169;2ch.net (123)");
        assert_eq!(thread_title(&raw).unwrap(), "【速報】山田太郎が会見");
    }

    #[test]
    fn test_thread_title_invalid_encoding() {
        assert!(matches!(thread_title(&[0x82, 0x20]), Err(Error::Record(_))));
    }

    #[test]
    fn test_extract_filters_by_day_and_dedups() {
        let day = ymd(2024, 1, 2);
        let today = key_at(2024, 1, 2, 12);
        let yesterday = key_at(2024, 1, 1, 12);
        let mut listing = Vec::new();
        listing.extend(sjis(&format!("{today}.dat<>一つ目 (10)\n")));
        listing.extend(sjis(&format!("{yesterday}.dat<>昨日のスレ (5)\n")));
        listing.extend(sjis("broken line without separator\n"));
        listing.extend(sjis(&format!("{today}.dat<>二つ目 (3)\r\n")));
        listing.extend(sjis("notanumber.dat<>bad key (1)\n"));
        listing.extend(sjis(&format!("{today}.dat<>a<>b\n")));

        let mut threads = ArticleMap::new();
        let added = extract_threads(&mut threads, &board(), &listing, day);

        assert_eq!(added, 1);
        let only = threads.iter().next().unwrap();
        assert_eq!(only.title, "一つ目");
        assert_eq!(only.name, "ニュース速報+");
        assert_eq!(
            only.url,
            format!("https://asahi.5ch.net/test/read.cgi/newsplus/{today}/")
        );
    }

    #[test]
    fn test_date_filter_is_exact() {
        let listing = sjis(&format!("{}.dat<>翌日のスレ (1)\n", key_at(2024, 1, 2, 0)));

        let mut on_first = ArticleMap::new();
        extract_threads(&mut on_first, &board(), &listing, ymd(2024, 1, 1));
        assert!(on_first.is_empty());

        let mut on_second = ArticleMap::new();
        extract_threads(&mut on_second, &board(), &listing, ymd(2024, 1, 2));
        assert_eq!(on_second.len(), 1);
    }

    #[test]
    fn test_title_length_boundary() {
        let key = key_at(2024, 1, 2, 12);
        let other = key + 1;
        let listing = sjis(&format!(
            "{key}.dat<>{}\n{other}.dat<>{}\n",
            "あ".repeat(512),
            "い".repeat(513)
        ));

        let mut threads = ArticleMap::new();
        extract_threads(&mut threads, &board(), &listing, ymd(2024, 1, 2));
        assert_eq!(threads.len(), 1);
        assert_eq!(threads.iter().next().unwrap().title.chars().count(), 512);
    }

    #[tokio::test]
    async fn test_transform_5ch_end_to_end() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let day = ymd(2024, 1, 2);
        let dir = day_dir(src.path(), day);
        write_fetch_info(
            &dir,
            &FetchInfo {
                date: "2024-01-02T10:00:00+09:00".to_string(),
                boards: vec![board()],
            },
        )
        .await
        .unwrap();
        let listing = sjis(&format!("{}.dat<>山田太郎が会見 (12)\n", key_at(2024, 1, 2, 9)));
        std::fs::write(dir.join("newsplus"), listing).unwrap();

        transform_5ch(src.path(), dest.path(), day).await.unwrap();

        let out = dest.path().join("20240102").join(FIVECH_ARTICLES_FILE);
        let text = std::fs::read_to_string(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("山田太郎が会見"));
    }

    #[tokio::test]
    async fn test_missing_subject_file_fails_the_day() {
        let src = tempfile::tempdir().unwrap();
        let day = ymd(2024, 1, 2);
        write_fetch_info(
            &day_dir(src.path(), day),
            &FetchInfo {
                date: "2024-01-02T10:00:00+09:00".to_string(),
                boards: vec![board()],
            },
        )
        .await
        .unwrap();

        let err = thread_map(src.path(), day).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
