pub mod ask;
pub mod config_cmd;
pub mod context;
pub mod gateway;
pub mod init;

use std::path::Path;
use std::sync::Arc;

use ragpack_config::AppConfig;
use ragpack_core::store::DocumentStore;
use ragpack_store::{InMemoryDocumentStore, load_directory};
use tracing::info;

/// Load every document under `dir` into a fresh in-memory store sized from
/// `config.store.capacity`.
pub async fn load_store(
    dir: &Path,
    config: &AppConfig,
) -> Result<Arc<InMemoryDocumentStore>, Box<dyn std::error::Error>> {
    let store = Arc::new(InMemoryDocumentStore::new(config.store.capacity));
    for document in load_directory(dir)? {
        store.upsert(document).await?;
    }
    info!(dir = %dir.display(), documents = store.count().await?, "Documents loaded");
    Ok(store)
}
