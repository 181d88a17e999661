//! Generation providers for ragpack.
//!
//! All providers implement the `ragpack_core::Provider` trait. The router
//! picks a target per request and wraps it in a one-step fallback chain.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::{FallbackOutcome, FallbackProvider, Target};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ModelChoice, ProviderRouter, build_from_config, classify, parse_model_choice};
