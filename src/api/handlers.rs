//! HTTP request handlers

use super::stream::text_response;
use super::types::{ChatRequest, ErrorResponse, HealthResponse, ModelInfo, ModelsResponse};
use super::{AppState, DELIVERY_HEADER};
use crate::llm::all_models;
use crate::tutor::{DeliveryMode, TutorError, TutorRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::Instrument;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Tutor turn, configured delivery discipline
        .route("/api/chat", post(chat))
        // Problem solver, always single-shot
        .route("/api/solve", post(solve))
        // Model info
        .route("/api/models", get(list_models))
        .route("/api/health", get(health))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Tutor
// ============================================================

fn tutor_span(mode: DeliveryMode) -> tracing::Span {
    tracing::info_span!(
        "tutor",
        request_id = %uuid::Uuid::new_v4(),
        mode = mode.as_str()
    )
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body?;
    let (request, api_key) = req.into_parts();
    respond(&state, state.delivery, &request, api_key.as_deref()).await
}

async fn solve(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body?;
    let (request, api_key) = req.into_parts();
    respond(&state, DeliveryMode::Single, &request, api_key.as_deref()).await
}

async fn respond(
    state: &AppState,
    mode: DeliveryMode,
    request: &TutorRequest,
    api_key: Option<&str>,
) -> Result<Response, AppError> {
    let span = tutor_span(mode);
    match mode {
        DeliveryMode::Single => {
            let answer = state
                .responder
                .answer(request, api_key)
                .instrument(span)
                .await?;
            let delivery = (
                HeaderName::from_static(DELIVERY_HEADER),
                HeaderValue::from_static(DeliveryMode::Single.as_str()),
            );
            Ok(([delivery], Json(answer)).into_response())
        }
        DeliveryMode::Stream => {
            let relay = state
                .responder
                .stream(request, api_key)
                .instrument(span)
                .await?;
            Ok(text_response(relay))
        }
    }
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let registry = state.responder.registry();
    let models = all_models()
        .iter()
        .map(|m| ModelInfo {
            id: m.id.to_string(),
            description: m.description.to_string(),
            context_window: m.context_window,
        })
        .collect();

    Json(ModelsResponse {
        models,
        default: registry.model().id.to_string(),
        configured: registry.has_default_credential(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("gyanmitra ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    MissingCredential(String),
    Internal(String),
}

impl From<TutorError> for AppError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::Validation(msg) => AppError::BadRequest(msg),
            TutorError::Auth(msg) => AppError::MissingCredential(msg),
            TutorError::Upstream(_) | TutorError::Transport(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MissingCredential(msg) => {
                tracing::warn!(error = %msg, "Rejected request without usable credential");
                return (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    msg,
                )
                    .into_response();
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Tutor request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
