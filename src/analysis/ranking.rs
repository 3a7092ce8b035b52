//! Trend ranking: which person names the day's titles mention most.
//!
//! Each title is normalised, tokenized, and reduced to its general
//! person-name proper nouns (`名詞,固有名詞,人名,一般`). Names on the stop-list
//! are dropped, and each remaining name collects the articles that mention it.
//! Names are ranked by article count, highest first. Equal counts keep the
//! order in which the names were first seen.

use super::tokenizer::{Token, Tokenizer};
use crate::config::DEFAULT_STOP_WORDS;
use crate::error::Result;
use crate::models::{ArticleRef, NewsArticle, TrendEntry};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Feature columns of a general person-name proper noun.
const PERSON_NAME_FEATURES: [&str; 4] = ["名詞", "固有名詞", "人名", "一般"];

/// A trailing annotation starts at the last of any of these.
const OPEN_BRACKETS: [char; 5] = ['(', '（', '[', '〈', '【'];

/// Tokens that are never ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopList {
    words: HashSet<String>,
}

impl StopList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl Default for StopList {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied())
    }
}

/// Prepare a title for tokenizing.
///
/// Lowercases and trims, cuts a trailing bracketed annotation, keeps only
/// what follows a `]`, and removes `:` and `にも`.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut t = lowered.trim();
    for bracket in OPEN_BRACKETS {
        if let Some(i) = t.rfind(bracket) {
            t = &t[..i];
        }
    }
    if let Some(i) = t.find(']') {
        t = &t[i..];
    }
    t.replace(':', "").replace("にも", "")
}

/// Whether `token` is tagged as a general person name.
pub fn is_person_name(token: &Token) -> bool {
    token.features.len() >= PERSON_NAME_FEATURES.len()
        && token
            .features
            .iter()
            .zip(PERSON_NAME_FEATURES)
            .all(|(f, expected)| f == expected)
}

/// Rank the person names mentioned in `articles`.
///
/// # Arguments
///
/// * `articles` - the day's articles; only titles are tokenized
/// * `tokenizer` - called once per normalized title
/// * `stop_list` - surface forms never ranked
/// * `max_ranked_terms` - cap on the returned entries
///
/// # Returns
///
/// Entries ordered by descending article count, ties in first-seen order. A
/// name mentioned several times in one title counts that article once.
///
/// # Errors
///
/// The first tokenizer error, which aborts the ranking.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), max_ranked_terms = max_ranked_terms))]
pub async fn rank<T: Tokenizer>(
    articles: &[NewsArticle],
    tokenizer: &mut T,
    stop_list: &StopList,
    max_ranked_terms: usize,
) -> Result<Vec<TrendEntry>> {
    let mut entries: Vec<TrendEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let title = normalize_title(&article.title);
        let tokens = tokenizer.parse(&title).await?;

        let mut credited: HashSet<&str> = HashSet::new();
        for token in tokens.iter().filter(|t| is_person_name(t)) {
            let word = token.surface.as_str();
            if stop_list.contains(word) || !credited.insert(word) {
                continue;
            }
            let slot = *index.entry(word.to_string()).or_insert_with(|| {
                entries.push(TrendEntry::new(word));
                entries.len() - 1
            });
            entries[slot].push_article(ArticleRef {
                title: article.title.clone(),
                url: article.url.clone(),
            });
        }
    }

    let total = entries.len();
    // stable: equal counts stay in first-seen order
    let ranked: Vec<TrendEntry> = entries
        .into_iter()
        .sorted_by_key(|e| Reverse(e.count()))
        .take(max_ranked_terms)
        .collect();

    debug!(top = ?ranked.first().map(|e| (&e.word, e.count())), "Top term");
    info!(terms = total, kept = ranked.len(), "Ranked trend terms");
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::fake::FakeTokenizer;
    use crate::error::Error;

    fn person(surface: &str) -> Token {
        Token::new(surface, &["名詞", "固有名詞", "人名", "一般", "*", "*"])
    }

    fn surname(surface: &str) -> Token {
        Token::new(surface, &["名詞", "固有名詞", "人名", "姓", "*", "*"])
    }

    fn particle(surface: &str) -> Token {
        Token::new(surface, &["助詞", "格助詞", "一般", "*"])
    }

    fn article(n: usize, title: &str) -> NewsArticle {
        NewsArticle {
            date: "2024-01-02T09:00:00+09:00".to_string(),
            url: format!("https://example.com/{n}"),
            name: "src".to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_normalize_title_cuts_annotations() {
        assert_eq!(normalize_title("  山田太郎が会見 (123)  "), "山田太郎が会見 ");
        assert_eq!(normalize_title("鈴木花子、結婚（画像あり）"), "鈴木花子、結婚");
        assert_eq!(normalize_title("速報 【悲報】 佐藤"), "速報 ");
        assert_eq!(normalize_title("ABC News: Tanaka"), "abc news tanaka");
        assert_eq!(normalize_title("山田にも批判"), "山田批判");
    }

    #[test]
    fn test_normalize_title_closing_bracket() {
        assert_eq!(normalize_title("速報]山田太郎が会見"), "]山田太郎が会見");
        assert_eq!(normalize_title("[速報]山田太郎が会見"), "");
        assert_eq!(normalize_title("速報]山田 [転載禁止]"), "]山田 ");
    }

    #[test]
    fn test_is_person_name() {
        assert!(is_person_name(&person("太郎")));
        assert!(!is_person_name(&surname("山田")));
        assert!(!is_person_name(&particle("が")));
        assert!(!is_person_name(&Token::new("x", &["名詞", "固有名詞"])));
    }

    #[test]
    fn test_stop_list() {
        let stop = StopList::default();
        assert!(stop.contains("ai"));
        assert!(stop.contains("な！"));
        assert!(!stop.contains("山田"));
        assert_eq!(stop.len(), 26);
    }

    #[tokio::test]
    async fn test_rank_counts_and_orders() {
        let articles = vec![
            article(1, "田中が会見"),
            article(2, "佐藤と田中"),
            article(3, "佐藤と田中と鈴木"),
            article(4, "aiが話題"),
        ];
        let mut tok = FakeTokenizer::default()
            .with("田中が会見", vec![person("田中"), particle("が")])
            .with("佐藤と田中", vec![person("佐藤"), particle("と"), person("田中")])
            .with(
                "佐藤と田中と鈴木",
                vec![person("佐藤"), person("田中"), surname("鈴木")],
            )
            .with("aiが話題", vec![person("ai")]);

        let ranked = rank(&articles, &mut tok, &StopList::default(), 100)
            .await
            .unwrap();

        let words: Vec<(&str, usize)> = ranked.iter().map(|e| (e.word.as_str(), e.count())).collect();
        assert_eq!(words, vec![("田中", 3), ("佐藤", 2)]);
        for e in &ranked {
            assert_eq!(e.count(), e.articles().len());
        }
        assert_eq!(ranked[1].articles()[0].url, "https://example.com/2");
        assert_eq!(ranked[1].articles()[0].title, "佐藤と田中");
    }

    #[tokio::test]
    async fn test_ties_keep_first_seen_order_and_repeat_identically() {
        let articles = vec![article(1, "b a"), article(2, "c"), article(3, "a")];
        let table = FakeTokenizer::default()
            .with("b a", vec![person("b"), person("a")])
            .with("c", vec![person("c")])
            .with("a", vec![person("a")]);
        let mut tok = table;

        let first = rank(&articles, &mut tok, &StopList::new(Vec::<String>::new()), 100)
            .await
            .unwrap();
        let second = rank(&articles, &mut tok, &StopList::new(Vec::<String>::new()), 100)
            .await
            .unwrap();

        let words: Vec<&str> = first.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_repeated_name_in_one_title_counts_once() {
        let articles = vec![article(1, "山田vs山田")];
        let mut tok = FakeTokenizer::default()
            .with("山田vs山田", vec![person("山田"), person("山田")]);

        let ranked = rank(&articles, &mut tok, &StopList::default(), 100)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].count(), 1);
    }

    #[tokio::test]
    async fn test_truncates_to_max_terms() {
        let articles: Vec<NewsArticle> = (0..5).map(|n| article(n, &format!("t{n}"))).collect();
        let mut tok = FakeTokenizer::default();
        for n in 0..5 {
            tok = tok.with(&format!("t{n}"), vec![person(&format!("name{n}"))]);
        }

        let ranked = rank(&articles, &mut tok, &StopList::default(), 3).await.unwrap();
        let words: Vec<&str> = ranked.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["name0", "name1", "name2"]);
    }

    #[tokio::test]
    async fn test_tokenizes_normalized_titles() {
        let articles = vec![article(1, "Tanaka: 会見 (2)")];
        let mut tok = FakeTokenizer::default();
        rank(&articles, &mut tok, &StopList::default(), 100).await.unwrap();
        assert_eq!(tok.calls, vec!["tanaka 会見 "]);
    }

    #[tokio::test]
    async fn test_tokenizer_failure_aborts() {
        let articles = vec![article(1, "ok"), article(2, "bad"), article(3, "never")];
        let mut tok = FakeTokenizer {
            fail_on: Some("bad".to_string()),
            ..Default::default()
        };

        let res = rank(&articles, &mut tok, &StopList::default(), 100).await;
        assert!(matches!(res, Err(Error::Tokenizer(_))));
        assert_eq!(tok.calls, vec!["ok", "bad"]);
    }
}
