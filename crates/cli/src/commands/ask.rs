//! `ragpack ask`: answer a question over local documents.

use std::path::Path;
use std::sync::Arc;

use ragpack_config::AppConfig;
use ragpack_gateway::ApiState;
use ragpack_gateway::api::answer;
use ragpack_providers::{build_from_config, parse_model_choice};
use ragpack_telemetry::Metrics;

pub async fn run(docs: &Path, message: &str, model: &str) -> Result<(), Box<dyn std::error::Error>> {
    let message = message.trim();
    if message.is_empty() {
        return Err("Message must not be empty".into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.has_api_key() {
        tracing::warn!("No API key configured; hosted providers will reject the request");
    }

    let explicit = parse_model_choice(model, &config.routing)?;
    let store = super::load_store(docs, &config).await?;
    let router = build_from_config(&config);
    let state = ApiState::new(config, store, router, Arc::new(Metrics::new()))?;

    let reply = answer(&state, message, explicit).await?;

    println!("{}", reply.response);
    println!();
    println!(
        "-- {} / {} ({} route{})",
        reply.provider,
        reply.model,
        reply.route.as_str(),
        if reply.fallback_used { ", fallback" } else { "" }
    );
    if reply.used_docs.is_empty() {
        println!("-- no documents matched");
    } else {
        println!("-- sources: {}", reply.used_docs.join(", "));
    }

    Ok(())
}
