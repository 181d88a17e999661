//! `ragpack gateway`: start the HTTP API server.

use ragpack_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ragpack gateway");
    println!("  Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("  Auth:       {}", if config.gateway.bearer_tokens.is_empty() { "open" } else { "bearer" });
    println!(
        "  Routing:    {} / {}",
        config.routing.primary.provider, config.routing.secondary.provider
    );

    ragpack_gateway::start(config).await?;

    Ok(())
}
