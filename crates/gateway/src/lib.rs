//! HTTP API gateway for ragpack.
//!
//! Exposes a health check plus the v1 API for document upload, context
//! packing and chat. Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use api::{ApiState, SharedApiState, v1_router};

/// Build the full router: `/health` plus `/v1`.
///
/// Layers applied:
/// - Bearer token authentication on `/v1` when tokens are configured
/// - CORS limited to `gateway.cors_origins`
/// - Request body size limit from `gateway.max_body_bytes`
/// - HTTP trace logging
pub fn build_router(state: SharedApiState) -> Router {
    let gateway = &state.config.gateway;
    let max_body = gateway.max_body_bytes;

    let origins: Vec<HeaderValue> = gateway
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    let v1 = v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: ragpack_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let auth = !config.gateway.bearer_tokens.is_empty();

    let state = Arc::new(ApiState::from_config(config)?);
    let app = build_router(state);

    info!(addr = %addr, auth, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bearer token middleware for `/v1`.
///
/// With no configured tokens every request passes.
async fn auth_middleware(
    State(state): State<SharedApiState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let tokens = &state.config.gateway.bearer_tokens;
    if tokens.is_empty() {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match auth_header {
        Some(token) if tokens.iter().any(|t| t == token) => Ok(next.run(req).await),
        _ => {
            warn!("Unauthorized request to /v1 API: missing or invalid bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(tokens: Vec<String>) -> SharedApiState {
        let mut config = ragpack_config::AppConfig::default();
        config.gateway.bearer_tokens = tokens;
        config.gateway.max_body_bytes = 1024;
        Arc::new(ApiState::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(vec![]));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_never_gated() {
        let app = build_router(test_state(vec!["secret".into()]));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn v1_open_without_tokens() {
        let app = build_router(test_state(vec![]));
        let req = Request::builder().uri("/v1/documents").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn v1_requires_bearer_when_configured() {
        let state = test_state(vec!["secret".into()]);

        let req = Request::builder().uri("/v1/status").body(Body::empty()).unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/v1/status")
            .header("Authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/v1/status")
            .header("Authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(test_state(vec![]));
        let body = serde_json::json!({"name": "big.txt", "content": "x".repeat(4096)});
        let req = Request::builder()
            .method("POST")
            .uri("/v1/documents")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
