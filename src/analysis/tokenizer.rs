//! Morphological analysis of article titles.
//!
//! Ranking only needs each token's surface form and its part-of-speech
//! feature list, so the analyzer sits behind the [`Tokenizer`] trait.
//! [`MecabTokenizer`] drives a long-lived `mecab` process. Tests use an
//! in-memory implementation.

use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, instrument};

/// Marker line MeCab prints after the tokens of one input line.
const EOS: &str = "EOS";

/// Parsed once at startup. A MeCab that cannot load its dictionary exits
/// before answering.
const WARMUP_TEXT: &str = "起動確認";

/// One token: its surface form and feature columns
/// (`品詞, 品詞細分類1, 品詞細分類2, 品詞細分類3, ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    pub features: Vec<String>,
}

impl Token {
    pub fn new(surface: impl Into<String>, features: &[&str]) -> Self {
        Self {
            surface: surface.into(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Parse one line of MeCab's default output, `surface\tf1,f2,...`.
    pub fn from_mecab_line(line: &str) -> Result<Self> {
        let (surface, features) = line
            .split_once('\t')
            .ok_or_else(|| Error::Tokenizer(format!("unexpected mecab output: {line:?}")))?;
        let columns: Vec<&str> = features.split(',').collect();
        Ok(Self::new(surface, &columns))
    }
}

/// Splits text into tagged tokens.
///
/// Any error is fatal for the analysis run.
pub trait Tokenizer {
    async fn parse(&mut self, text: &str) -> Result<Vec<Token>>;
}

/// A `mecab` child process fed one line per call.
///
/// The process is killed if the tokenizer is dropped without [`close`], so
/// every exit path of an analysis run releases it. Every failure, at startup,
/// while parsing or at exit, is an [`Error::Tokenizer`].
///
/// [`close`]: MecabTokenizer::close
pub struct MecabTokenizer {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl std::fmt::Debug for MecabTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MecabTokenizer")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl MecabTokenizer {
    /// Start `command -d <dicdir>` and check that it answers.
    ///
    /// # Errors
    ///
    /// [`Error::Tokenizer`] when the binary cannot be started, or when it
    /// exits or answers garbage instead of tokenizing a first line.
    #[instrument(level = "info")]
    pub async fn spawn(command: &str, dicdir: &str) -> Result<Self> {
        let mut child = Command::new(command)
            .arg("-d")
            .arg(dicdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Tokenizer(format!("failed to start {command}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Tokenizer("mecab stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Tokenizer("mecab stdout unavailable".to_string()))?;

        let mut tokenizer = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };
        tokenizer
            .parse(WARMUP_TEXT)
            .await
            .map_err(|e| match e {
                Error::Tokenizer(msg) => Error::Tokenizer(format!("{command} did not start: {msg}")),
                other => other,
            })?;
        info!(pid = ?tokenizer.child.id(), "Started mecab");
        Ok(tokenizer)
    }

    /// Close stdin and wait for the process to exit.
    ///
    /// A non-zero exit status is an error.
    pub async fn close(self) -> Result<()> {
        let MecabTokenizer {
            mut child,
            stdin,
            stdout,
        } = self;
        drop(stdin);
        drop(stdout);
        let status = child
            .wait()
            .await
            .map_err(|e| Error::Tokenizer(format!("failed to wait for mecab: {e}")))?;
        if !status.success() {
            return Err(Error::Tokenizer(format!("mecab exited with {status}")));
        }
        debug!(%status, "mecab closed");
        Ok(())
    }
}

impl Tokenizer for MecabTokenizer {
    async fn parse(&mut self, text: &str) -> Result<Vec<Token>> {
        // one input line per request; MeCab answers with one EOS per line
        let line = text.replace(['\r', '\n'], " ");
        let write_err = |e: std::io::Error| Error::Tokenizer(format!("failed to write to mecab: {e}"));
        self.stdin.write_all(line.as_bytes()).await.map_err(write_err)?;
        self.stdin.write_all(b"\n").await.map_err(write_err)?;
        self.stdin.flush().await.map_err(write_err)?;

        let mut tokens = Vec::new();
        loop {
            let out = self
                .stdout
                .next_line()
                .await
                .map_err(|e| Error::Tokenizer(format!("failed to read from mecab: {e}")))?
                .ok_or_else(|| Error::Tokenizer("mecab exited unexpectedly".to_string()))?;
            if out == EOS {
                return Ok(tokens);
            }
            tokens.push(Token::from_mecab_line(&out)?);
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;

    /// Tokenizes by looking titles up in a fixed table.
    #[derive(Debug, Default)]
    pub struct FakeTokenizer {
        pub table: HashMap<String, Vec<Token>>,
        pub calls: Vec<String>,
        pub fail_on: Option<String>,
    }

    impl FakeTokenizer {
        pub fn with(mut self, text: &str, tokens: Vec<Token>) -> Self {
            self.table.insert(text.to_string(), tokens);
            self
        }
    }

    impl Tokenizer for FakeTokenizer {
        async fn parse(&mut self, text: &str) -> Result<Vec<Token>> {
            self.calls.push(text.to_string());
            if self.fail_on.as_deref() == Some(text) {
                return Err(Error::Tokenizer(format!("cannot parse {text}")));
            }
            Ok(self.table.get(text).cloned().unwrap_or_default())
        }
    }
}
