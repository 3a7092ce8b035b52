//! Transform stage: extract the articles of one target day from raw fetches.
//!
//! Both extractors produce an [`ArticleMap`] keyed by article URL, which the
//! stage then writes as JSON lines through
//! [`write_articles`](crate::outputs::json::write_articles).
//!
//! | Source | Module | Input under `<src>/<YYYYMMDD>/` | Output |
//! |--------|--------|---------------------------------|--------|
//! | 5ch | [`fivech`] | `fetch_info.json` + one subject file per board | `5ch.jsonl` |
//! | RSS/Atom | [`rss`] | one raw feed file per configured feed | `rss.jsonl` |

use crate::models::NewsArticle;
use std::collections::HashSet;

pub mod fivech;
pub mod rss;

/// Articles keyed by URL, in first-seen order.
///
/// Inserting a URL that is already present is a no-op: the first occurrence
/// wins and nothing is merged.
#[derive(Debug, Default, Clone)]
pub struct ArticleMap {
    seen: HashSet<String>,
    articles: Vec<NewsArticle>,
}

impl ArticleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Insert `article` unless its URL is already present. Returns whether it
    /// was inserted.
    pub fn insert_if_absent(&mut self, article: NewsArticle) -> bool {
        if !self.seen.insert(article.url.clone()) {
            return false;
        }
        self.articles.push(article);
        true
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NewsArticle> {
        self.articles.iter()
    }
}
