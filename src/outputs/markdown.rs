//! Markdown rendering of a day's digest.
//!
//! The post carries front matter for the static site generator, followed by
//! one heading per ranked word and a bullet list of the articles citing it:
//!
//! ```text
//! ---
//! title: "2024/01/02 に話題になった人"
//! date: 2024-01-02T00:00:00+09:00
//! sidebar: "right"
//! ---
//!
//! ### 1位 田中 （2記事）
//! - [田中が会見](https://example.com/1)
//! - [田中と佐藤](https://example.com/2)
//! ```

use crate::models::Content;
use chrono::NaiveDate;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Render `content` as a Markdown post.
pub fn content_to_markdown(content: &Content) -> Result<String, std::fmt::Error> {
    let mut md = String::new();

    writeln!(md, "---")?;
    writeln!(md, "title: \"{} に話題になった人\"", content.format_date)?;
    writeln!(md, "date: {}", content.date)?;
    writeln!(md, "sidebar: \"right\"")?;
    writeln!(md, "---")?;

    for (i, item) in content.items.iter().enumerate() {
        writeln!(md)?;
        writeln!(md, "### {}位 {} （{}記事）", i + 1, item.word, item.count())?;
        for article in item.articles() {
            writeln!(md, "- [{}]({})", article.title, article.url)?;
        }
    }

    Ok(md)
}

/// `<dest>/YYYY/MM/DD.md`
pub fn post_path(dest: &Path, date: NaiveDate) -> PathBuf {
    dest.join(date.format("%Y/%m/%d.md").to_string())
}
