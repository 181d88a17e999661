//! In-memory document store, the working set for the gateway and CLI.

use async_trait::async_trait;
use ragpack_core::document::Document;
use ragpack_core::error::StoreError;
use ragpack_core::store::DocumentStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Stores documents in a Vec, bounded by `capacity`.
///
/// Names are unique. Once full, inserting a new name evicts the document
/// with the oldest `created_at`.
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Vec<Document>>>,
    capacity: usize,
}

impl InMemoryDocumentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new(500)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, document: Document) -> Result<bool, StoreError> {
        if document.name.trim().is_empty() {
            return Err(StoreError::InvalidDocument("name must not be empty".into()));
        }

        let mut documents = self.documents.write().await;
        let len_before = documents.len();
        documents.retain(|d| d.name != document.name);
        let replaced = documents.len() < len_before;

        if !replaced && documents.len() >= self.capacity {
            let oldest = documents
                .iter()
                .enumerate()
                .min_by_key(|(_, d)| d.created_at)
                .map(|(i, _)| i);
            if let Some(i) = oldest {
                let evicted = documents.remove(i);
                debug!(name = %evicted.name, "Evicted oldest document");
            }
        }

        documents.push(document);
        Ok(replaced)
    }

    async fn get(&self, name: &str) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|d| d.name == name).cloned())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let len_before = documents.len();
        documents.retain(|d| d.name != name);
        Ok(documents.len() < len_before)
    }

    async fn snapshot(&self, limit: usize) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;
        // Later insertions first, then a stable sort so equal timestamps
        // keep that order.
        let mut out: Vec<Document> = documents.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().await.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.documents.write().await.clear();
        Ok(())
    }
}
