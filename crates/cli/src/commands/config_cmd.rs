//! `ragpack config`: configuration management commands.

use ragpack_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}...", AppConfig::config_path().display());

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("  error: {e}");
            return Err(e.into());
        }
    };
    println!("  ok: config parsed and validated");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set RAGPACK_API_KEY or OPENAI_API_KEY)".to_string());
    }
    if config.gateway.host == "0.0.0.0" && config.gateway.bearer_tokens.is_empty() {
        warnings.push("Gateway bound to 0.0.0.0 without bearer tokens".to_string());
    }
    if config.routing.fallback && config.routing.primary == config.routing.secondary {
        warnings.push("Fallback enabled but primary and secondary targets are identical".to_string());
    }
    for w in &warnings {
        println!("  warning: {w}");
    }

    println!();
    println!("  Primary:    {}/{}", config.routing.primary.provider, config.routing.primary.model);
    println!(
        "  Secondary:  {}/{}",
        config.routing.secondary.provider, config.routing.secondary.model
    );
    println!(
        "  Chunking:   {} chars, {} overlap",
        config.retrieval.max_chars, config.retrieval.overlap_chars
    );
    println!(
        "  Packing:    top {} within {} chars",
        config.retrieval.top_k, config.retrieval.max_context_chars
    );
    println!("  Gateway:    {}:{}", config.gateway.host, config.gateway.port);

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render(&config)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&config.redacted())
}
