//! # ragpack Store
//!
//! Document store backends. The gateway and CLI own a store and hand the
//! retrieval pipeline an owned snapshot on every request.

pub mod in_memory;
pub mod loader;

pub use in_memory::InMemoryDocumentStore;
pub use loader::load_directory;
