//! Pipeline settings.
//!
//! Every field has a default, so running without a settings file works. A
//! YAML file passed with `--config` overrides any subset of them:
//!
//! ```yaml
//! max_retry: 5
//! retry_backoff_secs: 1
//! mecab_dicdir: /usr/lib/x86_64-linux-gnu/mecab/dic/mecab-ipadic-neologd
//! extra_stop_words: ["さん"]
//! ```

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Tokens never ranked as trends, however often they appear.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "web", "no", "お姉さん", "ニート", "ドラ", "新劇場版", "at", "風俗嬢", "加藤純一", "な！",
    "jk", "alt", "life", "rtx", "クラスター", "body", "mark", "ceo", "king", "id", "ユニ", "d2",
    "shadows", "v2", "ko", "ai",
];

/// Links on the 5ch board list page that are not boards.
pub const DEFAULT_EXCLUDED_BOARD_LINKS: &[&str] = &[
    "https://www.5ch.net/",
    "https://www.5ch.net/kakolog.html",
    "https://newsnavi.5ch.net/",
    "https://info.5ch.net/",
    "https://search.5ch.net/",
    "https://dig.5ch.net/",
    "https://stat.5ch.net/",
    "https://o.5ch.net/",
    "https://i.5ch.net/",
    "https://be.5ch.net/",
    "https://premium.5ch.net/",
    "https://info.5ch.net/wiki/",
    "https://matsuri.5ch.net/maru/",
    "https://info.5ch.net/?curid=2078",
    "mailto:admin@5ch.net",
    "https://www.bbspink.com/",
    "https://ronin.bbspink.com/",
    "https://info.5ch.net/rank/",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Retries after the first attempt of each fetch.
    pub max_retry: u32,
    /// Seconds slept between fetch attempts.
    pub retry_backoff_secs: u64,
    /// Page listing every 5ch board.
    pub board_list_url: String,
    /// MeCab executable.
    pub mecab_command: String,
    /// MeCab dictionary directory.
    pub mecab_dicdir: String,
    /// Items kept in the published digest.
    pub max_content_items: usize,
    /// Words kept after ranking.
    pub max_ranked_terms: usize,
    /// Replaces the built-in stop-list.
    pub stop_words: Vec<String>,
    /// Added to `stop_words`.
    pub extra_stop_words: Vec<String>,
    pub excluded_board_links: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retry: 3,
            retry_backoff_secs: 3,
            board_list_url: "https://menu.5ch.net/bbstable.html".to_string(),
            mecab_command: "mecab".to_string(),
            mecab_dicdir: "/usr/local/lib/mecab/dic/mecab-ipadic-neologd".to_string(),
            max_content_items: 30,
            max_ranked_terms: 100,
            stop_words: owned(DEFAULT_STOP_WORDS),
            extra_stop_words: Vec::new(),
            excluded_board_links: owned(DEFAULT_EXCLUDED_BOARD_LINKS),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_at("failed to read settings", path, e))?;
        let settings = Self::from_yaml(&text)
            .map_err(|e| Error::Config(format!("invalid settings {}: {e}", path.display())))?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // an empty document deserialises to unit, not to an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry, Duration::from_secs(self.retry_backoff_secs))
    }

    /// `stop_words` followed by `extra_stop_words`.
    pub fn all_stop_words(&self) -> impl Iterator<Item = &str> {
        self.stop_words
            .iter()
            .chain(self.extra_stop_words.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.max_retry, 3);
        assert_eq!(s.max_content_items, 30);
        assert_eq!(s.max_ranked_terms, 100);
        assert_eq!(s.stop_words.len(), 26);
        assert_eq!(s.retry_policy(), RetryPolicy::new(3, Duration::from_secs(3)));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let s = Settings::from_yaml("max_retry: 5\nextra_stop_words: [\"さん\"]\n").unwrap();
        assert_eq!(s.max_retry, 5);
        assert_eq!(s.retry_backoff_secs, 3);
        assert!(s.all_stop_words().any(|w| w == "さん"));
        assert!(s.all_stop_words().any(|w| w == "ai"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        assert!(Settings::from_yaml("max_retry: many").is_err());
    }

    #[tokio::test]
    async fn test_load_without_path_is_default() {
        assert_eq!(Settings::load(None).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        tokio::fs::write(&path, "max_content_items: 10\n").await.unwrap();
        let s = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(s.max_content_items, 10);
    }
}
