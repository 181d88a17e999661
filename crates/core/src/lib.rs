//! # ragpack Core
//!
//! Domain types, traits, and error definitions for the ragpack context
//! assembler. This crate has **zero framework dependencies**. It defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The document store and the generation provider are traits here.
//! Implementations live in their respective crates, and the retrieval
//! pipeline only ever receives plain `Document` values:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod document;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError};
pub use document::{Chunk, ContextResult, Document, ScoredChunk};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use store::DocumentStore;
