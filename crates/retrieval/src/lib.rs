//! # ragpack-retrieval
//!
//! Lexical retrieval over a small, user-uploaded document set: tokenize,
//! chunk with overlap, score by term frequency, then greedily pack the best
//! chunks into a character budget.
//!
//! Everything here is synchronous and pure. Callers hand in a document
//! snapshot and get back a [`ContextResult`](ragpack_core::ContextResult).

pub mod chunker;
pub mod packer;
pub mod prompt;
pub mod scorer;
pub mod tokenizer;

pub use chunker::{chunk, split_paragraphs};
pub use packer::{ContextBuilder, Ranking, pack};
pub use prompt::{assemble_messages, system_message};
pub use scorer::Scorer;
pub use tokenizer::{Tokenizer, Tokens, tokenize};
