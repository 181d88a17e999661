//! HTTP API v1: documents, context and chat.
//!
//! Endpoints:
//!
//! - `POST   /v1/documents`         Upload or replace a document
//! - `GET    /v1/documents`         List documents, newest first
//! - `GET    /v1/documents/{name}`  Fetch one document
//! - `DELETE /v1/documents/{name}`  Remove a document
//! - `POST   /v1/context`           Build packed context for a query
//! - `POST   /v1/chat`              Context + generation with routing and fallback
//! - `GET    /v1/metrics`           Counter snapshot
//! - `GET    /v1/status`            Store size, routing and uptime

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use ragpack_config::{AppConfig, ConfigError};
use ragpack_core::document::Document;
use ragpack_core::error::{ProviderError, StoreError};
use ragpack_core::provider::ProviderRequest;
use ragpack_core::store::DocumentStore;
use ragpack_providers::{ModelChoice, ProviderRouter, parse_model_choice};
use ragpack_retrieval::{ContextBuilder, assemble_messages};
use ragpack_store::InMemoryDocumentStore;
use ragpack_telemetry::{Metrics, MetricsSnapshot};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiState {
    pub config: AppConfig,
    pub builder: ContextBuilder,
    pub store: Arc<dyn DocumentStore>,
    pub router: ProviderRouter,
    pub metrics: Arc<Metrics>,
    pub start_time: DateTime<Utc>,
}

pub type SharedApiState = Arc<ApiState>;

impl ApiState {
    /// Assemble state from explicit parts. Fails on invalid retrieval limits.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        router: ProviderRouter,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConfigError> {
        let builder = ContextBuilder::new(config.retrieval.clone())?;
        Ok(Self {
            config,
            builder,
            store,
            router,
            metrics,
            start_time: Utc::now(),
        })
    }

    /// In-memory store and providers built from `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(InMemoryDocumentStore::new(config.store.capacity));
        let router = ragpack_providers::build_from_config(&config);
        Self::new(config, store, router, Arc::new(Metrics::new()))
    }

    /// Every stored document, newest first.
    ///
    /// The builder drops blank documents before applying
    /// `retrieval.max_documents`, so the store must not cut the list first.
    async fn snapshot(&self) -> Result<Vec<Document>, ApiError> {
        self.store.snapshot(usize::MAX).await.map_err(store_error)
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route(
            "/documents",
            post(upload_document_handler).get(list_documents_handler),
        )
        .route(
            "/documents/{name}",
            get(get_document_handler).delete(delete_document_handler),
        )
        .route("/context", post(context_handler))
        .route("/chat", post(chat_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::InvalidDocument(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        StoreError::Storage(_) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn core_error(e: ragpack_core::Error) -> ApiError {
    match e {
        ragpack_core::Error::Provider(e) => provider_error(e),
        ragpack_core::Error::Store(e) => store_error(e),
    }
}

fn provider_error(e: ProviderError) -> ApiError {
    match e {
        ProviderError::NotConfigured(_) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        ProviderError::Timeout(_) => api_error(StatusCode::GATEWAY_TIMEOUT, e.to_string()),
        _ => api_error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

// ── Documents ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UploadDocumentRequest {
    name: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize, Deserialize)]
pub struct UploadDocumentResponse {
    pub name: String,
    pub chars: usize,
    pub replaced: bool,
}

#[derive(Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub chars: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub count: usize,
    pub documents: Vec<DocumentSummary>,
}

async fn upload_document_handler(
    State(state): State<SharedApiState>,
    Json(req): Json<UploadDocumentRequest>,
) -> Result<(StatusCode, Json<UploadDocumentResponse>), ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Document name must not be empty"));
    }

    let document = Document::new(name.clone(), req.content);
    let chars = document.char_len();
    let replaced = state.store.upsert(document).await.map_err(store_error)?;
    state.metrics.record_document_uploaded();

    info!(name = %name, chars, replaced, "Document stored");

    Ok((
        StatusCode::CREATED,
        Json(UploadDocumentResponse {
            name,
            chars,
            replaced,
        }),
    ))
}

async fn list_documents_handler(
    State(state): State<SharedApiState>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state
        .store
        .snapshot(usize::MAX)
        .await
        .map_err(store_error)?;

    let documents: Vec<DocumentSummary> = documents
        .into_iter()
        .map(|d| DocumentSummary {
            chars: d.char_len(),
            name: d.name,
            created_at: d.created_at,
        })
        .collect();

    Ok(Json(DocumentListResponse {
        count: documents.len(),
        documents,
    }))
}

async fn get_document_handler(
    State(state): State<SharedApiState>,
    Path(name): Path<String>,
) -> Result<Json<Document>, ApiError> {
    match state.store.get(&name).await.map_err(store_error)? {
        Some(doc) => Ok(Json(doc)),
        None => Err(store_error(StoreError::NotFound(name))),
    }
}

async fn delete_document_handler(
    State(state): State<SharedApiState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&name).await.map_err(store_error)? {
        state.metrics.record_document_deleted();
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(store_error(StoreError::NotFound(name)))
    }
}

// ── Context ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ContextRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    max_context_chars: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct RankedChunkDto {
    pub chunk_id: String,
    pub doc_name: String,
    pub score: f64,
    pub packed: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ContextResponse {
    pub context: String,
    pub used_docs: Vec<String>,
    pub chunks_considered: usize,
    pub chunks_scored: usize,
    pub chunks: Vec<RankedChunkDto>,
}

async fn context_handler(
    State(state): State<SharedApiState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, ApiError> {
    let retrieval = state.builder.config();
    let top_k = req.top_k.unwrap_or(retrieval.top_k);
    let budget = req.max_context_chars.unwrap_or(retrieval.max_context_chars);
    if top_k == 0 || budget == 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "top_k and max_context_chars must be greater than 0",
        ));
    }

    let documents = state.snapshot().await?;
    let (result, ranking) = state
        .builder
        .build_context_ranked(&documents, &req.query, top_k, budget);
    state.metrics.record_context_build(result.context.chars().count());

    let chunks = ranking
        .scored
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, s)| RankedChunkDto {
            chunk_id: s.chunk.chunk_id,
            doc_name: s.chunk.doc_name,
            score: s.score,
            packed: i < result.chunks_packed,
        })
        .collect();

    Ok(Json(ContextResponse {
        context: result.context,
        used_docs: result.used_docs,
        chunks_considered: result.chunks_considered,
        chunks_scored: result.chunks_scored,
        chunks,
    }))
}

// ── Chat ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    /// "auto" (default), "primary", "secondary", or a configured provider/model
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub provider: String,
    pub model: String,
    pub route: ModelChoice,
    pub used_docs: Vec<String>,
    pub fallback_used: bool,
}

async fn chat_handler(
    State(state): State<SharedApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message must not be empty"));
    }
    state.metrics.record_chat_request();

    let explicit = parse_model_choice(req.model.as_deref().unwrap_or("auto"), state.router.routing())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    answer(&state, message, explicit).await.map(Json).map_err(|e| {
        warn!(error = %e, "v1/chat generation failed");
        core_error(e)
    })
}

/// Build context for `message`, route it, and generate an answer.
///
/// Shared by the HTTP chat endpoint and `ragpack ask`.
pub async fn answer(
    state: &ApiState,
    message: &str,
    explicit: Option<ModelChoice>,
) -> ragpack_core::Result<ChatResponse> {
    let documents = state.store.snapshot(usize::MAX).await?;
    let context = state.builder.build_context(&documents, message);
    state.metrics.record_context_build(context.context.chars().count());

    let route = state.router.classify(message, explicit);
    let chain = state.router.chain(route)?;
    let target = state.router.target_config(route);

    info!(
        route = route.as_str(),
        provider = %target.provider,
        used_docs = context.used_docs.len(),
        "Generating answer"
    );

    let request = ProviderRequest {
        model: target.model.clone(),
        messages: assemble_messages(&state.config.system_prompt, &context, message),
        temperature: state.config.default_temperature,
        max_tokens: Some(state.config.default_max_tokens),
    };

    match chain.execute(request).await {
        Ok(outcome) => {
            if outcome.failed_attempts > 0 {
                state.metrics.record_provider_failure(&target.provider);
            }
            if outcome.fallback_used {
                state.metrics.record_fallback();
            }
            let (prompt_tokens, completion_tokens) = outcome
                .response
                .usage
                .as_ref()
                .map(|u| (u.prompt_tokens, u.completion_tokens))
                .unwrap_or((0, 0));
            state
                .metrics
                .record_provider_success(&outcome.provider, prompt_tokens, completion_tokens);

            Ok(ChatResponse {
                response: outcome.response.message.content,
                provider: outcome.provider,
                model: outcome.response.model,
                route,
                used_docs: context.used_docs,
                fallback_used: outcome.fallback_used,
            })
        }
        Err(e) => {
            state.metrics.record_provider_failure(&target.provider);
            if chain.has_fallback() {
                let other = &state.router.target_config(route.other()).provider;
                state.metrics.record_provider_failure(other);
            }
            Err(e.into())
        }
    }
}

// ── Metrics / status ──────────────────────────────────────────────────────

async fn metrics_handler(State(state): State<SharedApiState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[derive(Serialize, Deserialize)]
pub struct RetrievalSummary {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
    pub max_context_chars: usize,
    pub max_documents: usize,
}

#[derive(Serialize, Deserialize)]
pub struct RoutingSummary {
    pub primary: String,
    pub secondary: String,
    pub fallback: bool,
    pub providers: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub store: String,
    pub documents: usize,
    pub retrieval: RetrievalSummary,
    pub routing: RoutingSummary,
    pub uptime_secs: i64,
}

async fn status_handler(
    State(state): State<SharedApiState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let documents = state.store.count().await.map_err(store_error)?;
    let retrieval = state.builder.config();
    let routing = state.router.routing();
    let target = |t: &ragpack_config::RouteTarget| format!("{}/{}", t.provider, t.model);

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.name().to_string(),
        documents,
        retrieval: RetrievalSummary {
            max_chars: retrieval.max_chars,
            overlap_chars: retrieval.overlap_chars,
            top_k: retrieval.top_k,
            max_context_chars: retrieval.max_context_chars,
            max_documents: retrieval.max_documents,
        },
        routing: RoutingSummary {
            primary: target(&routing.primary),
            secondary: target(&routing.secondary),
            fallback: routing.fallback,
            providers: state.router.list().into_iter().map(String::from).collect(),
        },
        uptime_secs: (Utc::now() - state.start_time).num_seconds().max(0),
    }))
}
