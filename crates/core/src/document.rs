//! Document and chunk domain types.
//!
//! These are the values that flow through the retrieval pipeline:
//! Store hands out a `Document` snapshot → chunker produces `Chunk`s →
//! scorer wraps them as `ScoredChunk`s → packer returns a `ContextResult`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-uploaded text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique name within the working set (usually a file name)
    pub name: String,

    /// Raw text content
    pub content: String,

    /// When the document was uploaded
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document stamped with the current time.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Override the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether the content has anything other than whitespace.
    pub fn is_usable(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Content length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A bounded fragment of one document, the atomic unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Name of the source document
    pub doc_name: String,

    /// `"<doc_name>#<index>"`, unique within one packing pass
    pub chunk_id: String,

    /// Chunk text
    pub text: String,
}

impl Chunk {
    pub fn new(doc_name: &str, index: usize, text: impl Into<String>) -> Self {
        Self {
            doc_name: doc_name.to_string(),
            chunk_id: format!("{doc_name}#{index}"),
            text: text.into(),
        }
    }
}

/// A chunk with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// The packed context handed to the generation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    /// Packed, document-tagged excerpts
    pub context: String,

    /// Names of documents that contributed, first-insertion order, no duplicates
    pub used_docs: Vec<String>,

    /// Chunks produced across all candidate documents
    #[serde(default)]
    pub chunks_considered: usize,

    /// Chunks with a positive score
    #[serde(default)]
    pub chunks_scored: usize,

    /// Chunks that made it into `context`
    #[serde(default)]
    pub chunks_packed: usize,
}

impl ContextResult {
    /// The no-context result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}
