//! Intake HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router with the intake handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Create records and hand them to the dispatcher
//! - Expose record status and breaker health
//!
//! # Routes
//! - `POST /documents`: create a record and queue it, `202`
//! - `GET /documents/{id}`: current record
//! - `POST /documents/{id}/reprocess`: queue again, `202`
//! - `GET /health`: service and breaker state

use std::sync::Arc;
use std::time::Duration;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::lifecycle::shutdown::signalled;
use crate::observability::metrics;
use crate::records::{create_record, DocumentStatus, NewDocument, RecordStore, StoreError};
use crate::resilience::{BreakerSnapshot, CircuitBreaker, CircuitState};
use crate::security::IssuerRateLimiter;
use crate::workflow::Dispatcher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Dispatcher,
    pub breakers: Vec<Arc<CircuitBreaker>>,
    pub limiter: Option<Arc<IssuerRateLimiter>>,
}

/// Intake request body.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub jurisdiction: String,
    pub issuer_id: String,
    #[serde(default)]
    pub notification_url: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub reference_code: String,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    in_flight: usize,
    breakers: Vec<BreakerSnapshot>,
}

/// Handler failures, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("record {0} not found")]
    NotFound(Uuid),

    #[error("rate limit exceeded for issuer '{0}'")]
    RateLimited(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// HTTP server for document intake.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/documents", post(submit_document))
            .route("/documents/{id}", get(get_document))
            .route("/documents/{id}/reprocess", post(reprocess_document))
            .route("/health", get(health))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn submit_document(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = body.map_err(|e| {
        metrics::record_intake("rejected");
        ApiError::BadRequest(e.body_text())
    })?;
    validate(&request).inspect_err(|_| metrics::record_intake("rejected"))?;

    if let Some(limiter) = &state.limiter {
        if !limiter.check(&request.issuer_id) {
            tracing::warn!(issuer = %request.issuer_id, "Rate limit exceeded");
            metrics::record_intake("rate_limited");
            return Err(ApiError::RateLimited(request.issuer_id));
        }
    }

    let draft = NewDocument {
        jurisdiction: request.jurisdiction.trim().to_uppercase(),
        notification_url: request.notification_url,
        payload: request.payload,
    };
    let record = create_record(state.store.as_ref(), draft).await?;
    state.dispatcher.dispatch(record.id);
    metrics::record_intake("accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            id: record.id,
            reference_code: record.reference_code,
            status: record.status,
            created_at: record.created_at,
        }),
    ))
}

fn validate(request: &SubmitRequest) -> Result<(), ApiError> {
    if request.jurisdiction.trim().is_empty() {
        return Err(ApiError::BadRequest("jurisdiction is required".into()));
    }
    if request.issuer_id.trim().is_empty() {
        return Err(ApiError::BadRequest("issuer_id is required".into()));
    }
    if !request.payload.is_object() {
        return Err(ApiError::BadRequest("payload must be a JSON object".into()));
    }
    if let Some(url) = &request.notification_url {
        let valid = Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
        if !valid {
            return Err(ApiError::BadRequest(format!("invalid notification_url '{url}'")));
        }
    }
    Ok(())
}

async fn get_document(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let record = state.store.get(id).await?.ok_or(ApiError::NotFound(id))?;
    Ok(Json(record).into_response())
}

async fn reprocess_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = state.store.get(id).await?.ok_or(ApiError::NotFound(id))?;
    tracing::info!(record_id = %id, status = %record.status, "Reprocess requested");
    state.dispatcher.dispatch(id);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "id": id, "status": record.status })),
    ))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let breakers: Vec<BreakerSnapshot> = state.breakers.iter().map(|b| b.snapshot()).collect();
    let degraded = breakers.iter().any(|b| b.state != CircuitState::Closed);
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        in_flight: state.dispatcher.in_flight(),
        breakers,
    })
}
