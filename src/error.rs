//! Error types shared by every pipeline stage.
//!
//! Lower-level failures are wrapped with the operation and the path or URL
//! they concern, so a stage-ending error printed at exit carries its full
//! context. [`AggregateError`] collects per-date failures of a multi-date run.

use std::fmt;
use std::path::Path;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status code expected 200 but was {status} : url={url}")]
    Status { status: u16, url: String },

    #[error("failed to parse url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("illegal 5ch board URL : {url}")]
    BoardUrl { url: String },

    #[error("{0}")]
    Config(String),

    /// A single input record that cannot be used; callers skip it.
    #[error("{0}")]
    Record(String),

    #[error("failed to parse date {value:?} as {format}")]
    DateParse { value: String, format: &'static str },

    #[error("tokenizer failure: {0}")]
    Tokenizer(String),

    #[error("failed to render markdown: {0}")]
    Render(#[from] fmt::Error),

    #[error("content size is zero: {date}")]
    EmptyContent { date: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Error::io(format!("{action}: {}", path.display()), source)
    }

    /// Whether the error ends a multi-date run at once instead of being
    /// collected with the other dates' failures. Tokenizer failures are.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Tokenizer(_))
    }

    pub fn json_at(action: &str, path: &Path, source: serde_json::Error) -> Self {
        Error::Json {
            context: format!("{action}: {}", path.display()),
            source,
        }
    }
}

/// Every failure collected by a multi-date run, in order of occurrence.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<Error>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: Error) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Aggregate(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred:", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            write!(f, "\n\t{}. {}", i + 1, e)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
