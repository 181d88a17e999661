//! Document store trait: the external owner of uploaded documents.
//!
//! The retrieval pipeline never talks to a store directly. The request
//! layer asks the store for a snapshot and passes that plain value into
//! the context builder, so a store can be swapped without touching the core.

use async_trait::async_trait;
use crate::document::Document;
use crate::error::StoreError;

/// The core DocumentStore trait.
///
/// Implementations: in-memory (gateway and CLI).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Insert a document, replacing any document with the same name.
    ///
    /// Returns `true` when an existing document was replaced.
    async fn upsert(&self, document: Document) -> std::result::Result<bool, StoreError>;

    /// Get a document by name.
    async fn get(&self, name: &str) -> std::result::Result<Option<Document>, StoreError>;

    /// Delete a document by name.
    async fn delete(&self, name: &str) -> std::result::Result<bool, StoreError>;

    /// Owned copy of at most `limit` documents, newest first.
    async fn snapshot(&self, limit: usize) -> std::result::Result<Vec<Document>, StoreError>;

    /// Get total document count.
    async fn count(&self) -> std::result::Result<usize, StoreError>;

    /// Remove all documents.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}
