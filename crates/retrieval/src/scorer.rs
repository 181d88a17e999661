//! Term-frequency relevance scorer.
//!
//! Each query token found in the chunk adds `1 + ln(1 + f)`, where `f` is
//! its frequency in the chunk. A chunk that contains the whole query
//! verbatim gets a flat phrase bonus. The sum is divided by the square root
//! of the chunk's token count. There is no corpus-wide IDF weighting.

use std::collections::HashMap;

use ragpack_config::RetrievalConfig;

use crate::tokenizer::Tokenizer;

pub struct Scorer<'a> {
    tokenizer: &'a Tokenizer,
    phrase_bonus: f64,
    min_phrase_chars: usize,
}

impl<'a> Scorer<'a> {
    pub fn new(tokenizer: &'a Tokenizer, phrase_bonus: f64, min_phrase_chars: usize) -> Self {
        Self {
            tokenizer,
            phrase_bonus,
            min_phrase_chars,
        }
    }

    pub fn from_config(tokenizer: &'a Tokenizer, config: &RetrievalConfig) -> Self {
        Self::new(tokenizer, config.phrase_bonus, config.min_phrase_chars)
    }

    /// Score one chunk against an already tokenized query. Returns `>= 0`;
    /// zero means no relevance.
    pub fn score(&self, query_tokens: &[String], chunk_text: &str, raw_query: &str) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let tokens = self.tokenizer.tokenize(chunk_text);
        let mut freq: HashMap<&str, usize> = HashMap::new();
        let mut token_count = 0usize;
        for token in tokens.iter() {
            *freq.entry(token).or_insert(0) += 1;
            token_count += 1;
        }
        if token_count == 0 {
            return 0.0;
        }

        let mut score: f64 = query_tokens
            .iter()
            .filter_map(|q| freq.get(q.as_str()))
            .map(|&f| 1.0 + (1.0 + f as f64).ln())
            .sum();

        let phrase = raw_query.trim().to_lowercase();
        if phrase.chars().count() >= self.min_phrase_chars
            && chunk_text.to_lowercase().contains(&phrase)
        {
            score += self.phrase_bonus;
        }

        score / (token_count as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer(tokenizer: &Tokenizer) -> Scorer<'_> {
        Scorer::from_config(tokenizer, &RetrievalConfig::default())
    }

    fn query(text: &str, tokenizer: &Tokenizer) -> Vec<String> {
        tokenizer.tokenize(text).to_vec()
    }

    #[test]
    fn empty_query_scores_zero() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        assert_eq!(s.score(&[], "refund within thirty days", "the"), 0.0);
    }

    #[test]
    fn empty_chunk_scores_zero() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let q = query("refund policy", &tokenizer);
        assert_eq!(s.score(&q, "", "refund policy"), 0.0);
        assert_eq!(s.score(&q, "the and of", "refund policy"), 0.0);
    }

    #[test]
    fn unrelated_chunk_scores_zero() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let q = query("refund", &tokenizer);
        assert_eq!(s.score(&q, "shipping takes three business days", "refund"), 0.0);
    }

    #[test]
    fn single_match_formula() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let q = query("refund", &tokenizer);
        // chunk tokens: refund, refund, allowed, always -> f = 2, n = 4
        let score = s.score(&q, "refund refund allowed always", "refund");
        let expected = (1.0 + 3f64.ln()) / 4f64.sqrt();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn phrase_bonus_adds_exactly_bonus_after_normalization() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let raw = "iade süre"; // 9 characters
        let q = query(raw, &tokenizer);

        let with_phrase = s.score(&q, "iade süre bilgisi", raw);
        let reordered = s.score(&q, "süre iade bilgisi", raw);

        let n = 3f64;
        assert!(with_phrase > reordered);
        assert!((with_phrase - reordered - 5.0 / n.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn short_query_gets_no_phrase_bonus() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let raw = "kargo"; // below 8 characters
        let q = query(raw, &tokenizer);
        let score = s.score(&q, "kargo ücretsiz", raw);
        let expected = (1.0 + 2f64.ln()) / 2f64.sqrt();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn phrase_match_is_case_insensitive_and_trimmed() {
        let tokenizer = Tokenizer::default();
        let s = Scorer::new(&tokenizer, 10.0, 8);
        let raw = "  Express Delivery  ";
        let q = query(raw, &tokenizer);
        let score = s.score(&q, "We offer EXPRESS DELIVERY nationwide", raw);
        // tokens: we, offer, express, delivery, nationwide
        let expected = (2.0 * (1.0 + 2f64.ln()) + 10.0) / 5f64.sqrt();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn longer_chunks_are_penalized() {
        let tokenizer = Tokenizer::default();
        let s = scorer(&tokenizer);
        let q = query("warranty", &tokenizer);
        let short = s.score(&q, "warranty covers parts", "warranty");
        let long = s.score(
            &q,
            "warranty covers parts labour shipping handling batteries screens cables",
            "warranty",
        );
        assert!(short > long);
        assert!(long > 0.0);
    }
}
