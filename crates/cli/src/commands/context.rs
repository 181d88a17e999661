//! `ragpack context`: print the packed context for local documents.
//!
//! Runs only the retrieval pipeline. No provider is contacted.

use std::fmt::Write;
use std::path::Path;

use ragpack_config::AppConfig;
use ragpack_core::document::ContextResult;
use ragpack_core::store::DocumentStore;
use ragpack_retrieval::{ContextBuilder, Ranking};

pub async fn run(
    docs: &Path,
    query: &str,
    top_k: Option<usize>,
    max_chars: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let budget = max_chars.unwrap_or(config.retrieval.max_context_chars);
    if top_k == 0 || budget == 0 {
        return Err("--top-k and --max-chars must be greater than 0".into());
    }

    let store = super::load_store(docs, &config).await?;
    let documents = store.snapshot(usize::MAX).await?;
    let builder = ContextBuilder::new(config.retrieval.clone())?;
    let (result, ranking) = builder.build_context_ranked(&documents, query, top_k, budget);

    print!("{}", report(&result, &ranking, top_k));
    Ok(())
}

fn report(result: &ContextResult, ranking: &Ranking, top_k: usize) -> String {
    let mut out = String::new();
    if result.is_empty() {
        out.push_str("(no matching context)\n");
    } else {
        out.push_str(&result.context);
    }

    let _ = writeln!(out, "---");
    let _ = writeln!(
        out,
        "chunks: {} considered, {} scored, {} packed",
        result.chunks_considered, result.chunks_scored, result.chunks_packed
    );
    for (i, s) in ranking.scored.iter().take(top_k).enumerate() {
        let mark = if i < result.chunks_packed { '+' } else { '-' };
        let _ = writeln!(out, "  {mark} {:>8.3}  {}", s.score, s.chunk.chunk_id);
    }
    if !result.used_docs.is_empty() {
        let _ = writeln!(out, "used: {}", result.used_docs.join(", "));
    }
    out
}
