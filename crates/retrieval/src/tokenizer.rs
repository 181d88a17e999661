//! Text normalizer and tokenizer.
//!
//! Lowercases, replaces everything that is not an ASCII letter, digit,
//! whitespace or one of the Turkish letters `ç ğ ı ö ş ü` with a space,
//! splits on whitespace, then drops tokens shorter than two characters and
//! stopwords.

use std::collections::HashSet;
use std::sync::LazyLock;

use ragpack_config::{DEFAULT_STOPWORDS, RetrievalConfig};

const TURKISH_LETTERS: [char; 6] = ['ç', 'ğ', 'ı', 'ö', 'ş', 'ü'];

static DEFAULT_TOKENIZER: LazyLock<Tokenizer> = LazyLock::new(Tokenizer::default);

/// Tokenizer with a fixed stopword set.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Build a tokenizer from an explicit stopword list.
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Build a tokenizer from `stopwords` + `extra_stopwords`.
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.all_stopwords())
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Normalize `text` and return a restartable token sequence over it.
    pub fn tokenize(&self, text: &str) -> Tokens<'_> {
        Tokens {
            buffer: normalize(text),
            tokenizer: self,
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied())
    }
}

/// Normalized text plus the filter that yields its tokens.
///
/// Owns one lowercased buffer; `iter()` can be called any number of times
/// and never allocates per token.
pub struct Tokens<'a> {
    buffer: String,
    tokenizer: &'a Tokenizer,
}

impl<'a> Tokens<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.buffer
            .split_whitespace()
            .filter(|piece| piece.chars().count() >= 2)
            .filter(|piece| !self.tokenizer.is_stopword(piece))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

/// Tokenize with the default bilingual stopword set.
pub fn tokenize(text: &str) -> Vec<String> {
    DEFAULT_TOKENIZER.tokenize(text).to_vec()
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() || TURKISH_LETTERS.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .collect()
}
