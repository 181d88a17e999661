//! Context packer: ranks chunks from a document snapshot and greedily
//! packs the best of them into a character budget.
//!
//! # Flow
//!
//! 1. Drop blank documents, keep at most `max_documents` in given order
//! 2. Tokenize the query once
//! 3. Chunk every document into one pool (discovery order)
//! 4. Score, drop zero scores, stable sort by score descending
//! 5. Walk the top `top_k` and append `[doc]\ntext` pieces until the next
//!    one would overflow `max_context_chars`, then stop
//!
//! Packing consumes the ranking as a prefix: it never skips an oversized
//! piece to try a smaller, lower-ranked one.
//!
//! # Determinism
//!
//! Output depends only on the documents and the query. No clock, randomness
//! or shared mutable state is consulted, so concurrent calls need no locking.

use std::cmp::Ordering;

use ragpack_config::{ConfigError, RetrievalConfig};
use ragpack_core::{Chunk, ContextResult, Document, ScoredChunk};
use tracing::debug;

use crate::chunker::chunk;
use crate::scorer::Scorer;
use crate::tokenizer::Tokenizer;

/// Ranked chunks for one query.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Chunks with a positive score, best first
    pub scored: Vec<ScoredChunk>,
    /// Size of the chunk pool before scoring
    pub chunks_considered: usize,
}

/// Builds packed context strings from document snapshots.
///
/// Holds only validated configuration and the stopword set; share it
/// behind an `Arc` across requests.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: RetrievalConfig,
    tokenizer: Tokenizer,
}

impl ContextBuilder {
    /// Create a builder, rejecting invalid chunking or packing limits.
    pub fn new(config: RetrievalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tokenizer = Tokenizer::from_config(&config);
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Chunk and score every usable document, best chunks first.
    pub fn rank(&self, documents: &[Document], query: &str) -> Ranking {
        let usable: Vec<&Document> = documents
            .iter()
            .filter(|d| d.is_usable())
            .take(self.config.max_documents)
            .collect();
        if usable.is_empty() {
            return Ranking::default();
        }

        let query_tokens = self.tokenizer.tokenize(query).to_vec();

        let pool: Vec<Chunk> = usable
            .iter()
            .flat_map(|d| {
                chunk(
                    &d.name,
                    &d.content,
                    self.config.max_chars,
                    self.config.overlap_chars,
                )
            })
            .collect();
        let chunks_considered = pool.len();

        let scorer = Scorer::from_config(&self.tokenizer, &self.config);
        let mut scored: Vec<ScoredChunk> = pool
            .into_iter()
            .filter_map(|c| {
                let score = scorer.score(&query_tokens, &c.text, query);
                (score > 0.0).then_some(ScoredChunk { chunk: c, score })
            })
            .collect();

        // Vec::sort_by is stable: equal scores keep discovery order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            docs = usable.len(),
            query_tokens = query_tokens.len(),
            chunks = chunks_considered,
            scored = scored.len(),
            "Ranked chunks"
        );

        Ranking {
            scored,
            chunks_considered,
        }
    }

    /// Build context with the configured `top_k` and `max_context_chars`.
    pub fn build_context(&self, documents: &[Document], query: &str) -> ContextResult {
        self.build_context_with(
            documents,
            query,
            self.config.top_k,
            self.config.max_context_chars,
        )
    }

    /// Build context with explicit packing limits.
    pub fn build_context_with(
        &self,
        documents: &[Document],
        query: &str,
        top_k: usize,
        max_context_chars: usize,
    ) -> ContextResult {
        if documents.iter().all(|d| !d.is_usable()) {
            return ContextResult::empty();
        }
        let (result, _) = self.build_context_ranked(documents, query, top_k, max_context_chars);
        result
    }

    /// Build context and also return the full ranking it was packed from.
    pub fn build_context_ranked(
        &self,
        documents: &[Document],
        query: &str,
        top_k: usize,
        max_context_chars: usize,
    ) -> (ContextResult, Ranking) {
        let ranking = self.rank(documents, query);
        let mut result = pack(&ranking.scored, top_k, max_context_chars);
        result.chunks_considered = ranking.chunks_considered;
        result.chunks_scored = ranking.scored.len();

        debug!(
            used = result.used_docs.len(),
            packed = result.chunks_packed,
            chars = result.context.chars().count(),
            budget = max_context_chars,
            "Packed context"
        );

        (result, ranking)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        let config = RetrievalConfig::default();
        let tokenizer = Tokenizer::from_config(&config);
        Self { config, tokenizer }
    }
}

/// Greedy prefix packing of ranked chunks into a character budget.
pub fn pack(ranked: &[ScoredChunk], top_k: usize, max_context_chars: usize) -> ContextResult {
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;
    let mut used_docs: Vec<String> = Vec::new();
    let mut packed = 0usize;

    for scored in ranked.iter().take(top_k) {
        let piece = format_piece(&scored.chunk);
        let piece_chars = piece.chars().count();
        if buffer_chars + piece_chars > max_context_chars {
            break;
        }

        buffer.push_str(&piece);
        buffer_chars += piece_chars;
        packed += 1;
        if !used_docs.contains(&scored.chunk.doc_name) {
            used_docs.push(scored.chunk.doc_name.clone());
        }
    }

    ContextResult {
        context: buffer.trim().to_string(),
        used_docs,
        chunks_packed: packed,
        ..ContextResult::default()
    }
}

/// `[doc name]` header, chunk text, blank line.
fn format_piece(chunk: &Chunk) -> String {
    format!("[{}]\n{}\n\n", chunk.doc_name, chunk.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn doc(name: &str, content: &str) -> Document {
        Document::new(name, content).with_created_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn scored(doc_name: &str, index: usize, text: &str, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(doc_name, index, text),
            score,
        }
    }

    #[test]
    fn no_documents_yields_empty_context() {
        let builder = ContextBuilder::default();
        let result = builder.build_context(&[], "anything");
        assert_eq!(result, ContextResult::empty());
    }

    #[test]
    fn blank_documents_yield_empty_context() {
        let builder = ContextBuilder::default();
        let docs = vec![doc("a", "   "), doc("b", "\n\n")];
        let result = builder.build_context(&docs, "refund");
        assert!(result.context.is_empty());
        assert!(result.used_docs.is_empty());
    }

    #[test]
    fn empty_query_yields_empty_context() {
        let builder = ContextBuilder::default();
        let docs = vec![doc("policy", "Refunds are processed within 14 days.")];
        let result = builder.build_context(&docs, "the ve bir");
        assert!(result.is_empty());
        assert_eq!(result.chunks_considered, 1);
        assert_eq!(result.chunks_scored, 0);
    }

    #[test]
    fn relevant_document_is_packed_and_tagged() {
        let builder = ContextBuilder::default();
        let docs = vec![
            doc("shipping.md", "Orders ship within two business days."),
            doc("refunds.md", "Refunds are issued to the original payment method."),
        ];
        let result = builder.build_context(&docs, "how do refunds work");
        assert_eq!(result.used_docs, vec!["refunds.md".to_string()]);
        assert!(result.context.starts_with("[refunds.md]\n"));
        assert!(result.context.contains("original payment method"));
        assert!(!result.context.contains("Orders ship"));
    }

    #[test]
    fn ranking_prefers_denser_match() {
        let builder = ContextBuilder::default();
        let docs = vec![
            doc("long", "warranty covers screens batteries cables chargers cases stands"),
            doc("short", "warranty period warranty terms"),
        ];
        let ranking = builder.rank(&docs, "warranty");
        let order: Vec<&str> = ranking.scored.iter().map(|s| s.chunk.doc_name.as_str()).collect();
        assert_eq!(order, vec!["short", "long"]);
    }

    #[test]
    fn equal_scores_keep_discovery_order() {
        let builder = ContextBuilder::default();
        let docs = vec![
            doc("first", "battery life"),
            doc("second", "battery life"),
            doc("third", "battery life"),
        ];
        let ranking = builder.rank(&docs, "battery");
        let order: Vec<&str> = ranking.scored.iter().map(|s| s.chunk.doc_name.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn only_most_recent_documents_are_considered() {
        let config = RetrievalConfig {
            max_documents: 2,
            ..RetrievalConfig::default()
        };
        let builder = ContextBuilder::new(config).unwrap();
        let docs = vec![
            doc("newest", "invoice copy"),
            doc("blank", "  "),
            doc("middle", "invoice total"),
            doc("oldest", "invoice archive"),
        ];
        let result = builder.build_context(&docs, "invoice");
        assert_eq!(result.used_docs, vec!["newest".to_string(), "middle".to_string()]);
        assert_eq!(result.chunks_considered, 2);
    }

    #[test]
    fn packing_stops_at_first_piece_that_overflows() {
        let ranked = vec![
            scored("a", 0, &"x".repeat(30), 3.0),
            scored("b", 0, &"y".repeat(80), 2.0),
            scored("c", 0, "z", 1.0),
        ];
        // piece a = 3 + 1 + 30 + 2 = 36 chars; piece b = 86 chars
        let result = pack(&ranked, 6, 100);
        assert_eq!(result.used_docs, vec!["a".to_string()]);
        assert_eq!(result.chunks_packed, 1);
        assert!(!result.context.contains('z'));
    }

    #[test]
    fn packing_respects_top_k() {
        let ranked = vec![
            scored("a", 0, "one", 3.0),
            scored("b", 0, "two", 2.0),
            scored("c", 0, "three", 1.0),
        ];
        let result = pack(&ranked, 2, 4500);
        assert_eq!(result.used_docs, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(result.chunks_packed, 2);
        assert_eq!(result.context, "[a]\none\n\n[b]\ntwo");
    }

    #[test]
    fn used_docs_are_deduplicated_in_insertion_order() {
        let ranked = vec![
            scored("b", 1, "beta two", 4.0),
            scored("a", 0, "alpha", 3.0),
            scored("b", 0, "beta one", 2.0),
        ];
        let result = pack(&ranked, 6, 4500);
        assert_eq!(result.used_docs, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn context_never_exceeds_budget() {
        let builder = ContextBuilder::default();
        let body = "delivery options include courier pickup and lockers. ".repeat(60);
        let docs: Vec<Document> = (0..5).map(|i| doc(&format!("d{i}"), &body)).collect();

        for budget in [1, 50, 500, 1300, 2600, 4500, 10_000] {
            let result = builder.build_context_with(&docs, "delivery lockers", 6, budget);
            assert!(result.context.chars().count() <= budget, "budget {budget}");
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let builder = ContextBuilder::default();
        let docs = vec![
            doc("a", "Kargo ücreti 50 TL.\n\nİade süresi 14 gündür."),
            doc("b", "Return shipping is free for defective items."),
        ];
        let first = builder.build_context(&docs, "iade süresi nedir");
        let second = builder.build_context(&docs, "iade süresi nedir");
        assert_eq!(first, second);
        assert_eq!(first.used_docs, vec!["a".to_string()]);
    }

    #[test]
    fn invalid_geometry_rejected_at_construction() {
        let config = RetrievalConfig {
            max_chars: 300,
            overlap_chars: 300,
            ..RetrievalConfig::default()
        };
        assert!(ContextBuilder::new(config).is_err());
    }
}
