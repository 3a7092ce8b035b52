//! Data models passed between the pipeline stages.
//!
//! Every stage reads the previous stage's output from disk and writes its own:
//! - [`FetchInfo`] / [`Board`]: which 5ch boards a fetch run saved
//! - [`FeedSource`]: one configured RSS/Atom feed
//! - [`NewsArticle`]: one extracted thread or feed entry, source-agnostic
//! - [`TrendEntry`] / [`ArticleRef`]: one ranked person name and its articles
//! - [`Content`]: the per-day digest handed to the publish stage
//!
//! Field names follow the on-disk JSON keys.

use serde::{Deserialize, Serialize};

/// Longest title, in characters, an extracted record may carry.
pub const MAX_TITLE_CHARS: usize = 512;

/// A 5ch board discovered on the board list page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Board {
    /// Board id, e.g. `newsplus`.
    pub id: String,
    /// Display name of the board.
    pub name: String,
    /// Board base URL, e.g. `https://asahi.5ch.net/newsplus/`.
    pub url: String,
}

/// Snapshot of the boards saved by one fetch run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FetchInfo {
    /// When the fetch ran, RFC3339.
    pub date: String,
    pub boards: Vec<Board>,
}

/// A configured feed. The raw feed is saved under its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// One extracted article or thread.
///
/// Produced identically by the 5ch and RSS extractors so ranking does not
/// care where an article came from. `url` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsArticle {
    /// Publication time in local time, RFC3339.
    pub date: String,
    pub url: String,
    /// Source name (board or feed title).
    pub name: String,
    pub title: String,
}

impl NewsArticle {
    /// Whether `title` fits within [`MAX_TITLE_CHARS`].
    pub fn title_fits(title: &str) -> bool {
        title.chars().count() <= MAX_TITLE_CHARS
    }
}

/// A title and link cited by a trend entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
}

/// A ranked word and the articles mentioning it.
///
/// `count` always equals `articles.len()`; it is only changed through
/// [`TrendEntry::push_article`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "TrendEntryRepr")]
pub struct TrendEntry {
    pub word: String,
    count: usize,
    articles: Vec<ArticleRef>,
}

#[derive(Deserialize)]
struct TrendEntryRepr {
    word: String,
    #[serde(default)]
    articles: Vec<ArticleRef>,
}

impl From<TrendEntryRepr> for TrendEntry {
    fn from(repr: TrendEntryRepr) -> Self {
        // count is derived; whatever the file says is recomputed
        let mut entry = TrendEntry::new(repr.word);
        for a in repr.articles {
            entry.push_article(a);
        }
        entry
    }
}

impl TrendEntry {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            count: 0,
            articles: Vec::new(),
        }
    }

    pub fn push_article(&mut self, article: ArticleRef) {
        self.articles.push(article);
        self.count = self.articles.len();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn articles(&self) -> &[ArticleRef] {
        &self.articles
    }
}

/// The digest for one day, as written by the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Content {
    /// Display date, `YYYY/MM/DD`.
    pub format_date: String,
    /// Local midnight of the day, RFC3339.
    pub date: String,
    pub items: Vec<TrendEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(n: usize) -> ArticleRef {
        ArticleRef {
            title: format!("title {n}"),
            url: format!("https://example.com/{n}"),
        }
    }

    #[test]
    fn test_count_tracks_articles() {
        let mut entry = TrendEntry::new("山田太郎");
        assert_eq!(entry.count(), 0);
        entry.push_article(article(1));
        entry.push_article(article(2));
        assert_eq!(entry.count(), 2);
        assert_eq!(entry.count(), entry.articles().len());
    }

    #[test]
    fn test_content_json_round_trip() {
        let mut entry = TrendEntry::new("山田太郎");
        entry.push_article(article(1));
        let content = Content {
            format_date: "2024/01/02".to_string(),
            date: "2024-01-02T00:00:00+09:00".to_string(),
            items: vec![entry],
        };

        let json = serde_json::to_string(&content).unwrap();
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_content_json_keys() {
        let mut entry = TrendEntry::new("w");
        entry.push_article(article(7));
        let value = serde_json::to_value(Content {
            format_date: "2024/01/02".to_string(),
            date: "2024-01-02T00:00:00Z".to_string(),
            items: vec![entry],
        })
        .unwrap();

        assert_eq!(value["format_date"], "2024/01/02");
        assert_eq!(value["items"][0]["word"], "w");
        assert_eq!(value["items"][0]["count"], 1);
        assert_eq!(value["items"][0]["articles"][0]["url"], "https://example.com/7");
    }

    #[test]
    fn test_stored_count_is_recomputed_on_read() {
        let json = r#"{"word":"w","count":99,"articles":[{"title":"t","url":"u"}]}"#;
        let entry: TrendEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.count(), 1);
    }

    #[test]
    fn test_news_article_reads_extra_fields() {
        let json = r#"{"date":"2024-01-01T10:00:00+09:00","url":"u","name":"n","title":"t","category":"c"}"#;
        let a: NewsArticle = serde_json::from_str(json).unwrap();
        assert_eq!(a.title, "t");
    }

    #[test]
    fn test_title_length_boundary() {
        assert!(NewsArticle::title_fits(&"あ".repeat(512)));
        assert!(!NewsArticle::title_fits(&"あ".repeat(513)));
    }
}
