//! Axum handlers for the inbound endpoint
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::AppState;
use super::auth::NONCE_HEADER;
use crate::ScrivenerError;
use crate::rpc::{ChatRequest, Envelope, ErrorsQuery, GenerateRequest, StatsQuery};
use crate::types::{Generation, Requester};
use crate::usage::{DailyStats, UsageLogEntry};

/// Action names nonces are bound to.
pub mod actions {
    pub const GENERATE: &str = "generate";
    pub const CHAT: &str = "chat";
    pub const TEST_CONNECTION: &str = "test_connection";
    pub const CLEAR_CACHE: &str = "clear_cache";
    pub const STATS: &str = "stats";
    pub const ERRORS: &str = "errors";

    pub const ALL: [&str; 6] = [GENERATE, CHAT, TEST_CONNECTION, CLEAR_CACHE, STATS, ERRORS];
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

fn reject<T>(status: StatusCode, message: &str) -> Reply<T> {
    (status, Json(Envelope::error(message)))
}

/// HTTP status for a failed operation; the envelope carries the message.
pub fn status_for(err: &ScrivenerError) -> StatusCode {
    match err {
        ScrivenerError::PermissionDenied => StatusCode::FORBIDDEN,
        ScrivenerError::SubjectNotFound(_) => StatusCode::NOT_FOUND,
        ScrivenerError::SubjectTypeNotAllowed(_)
        | ScrivenerError::EmptySubjectContent
        | ScrivenerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ScrivenerError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ScrivenerError::UpstreamTransport(_)
        | ScrivenerError::UpstreamApi { .. }
        | ScrivenerError::MalformedUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
        ScrivenerError::MissingCredential
        | ScrivenerError::Configuration(_)
        | ScrivenerError::Storage(_)
        | ScrivenerError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T>(result: crate::Result<T>) -> Reply<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(Envelope::ok(data))),
        Err(e) => (status_for(&e), Json(Envelope::error(e.to_string()))),
    }
}

fn bearer_requester<T>(state: &AppState, headers: &HeaderMap) -> Result<Requester, Reply<T>> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    state
        .tokens
        .lookup(token.trim())
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "invalid bearer token"))
}

/// Resolve the requester and check the nonce for `action`.
fn authorize<T>(state: &AppState, headers: &HeaderMap, action: &str) -> Result<Requester, Reply<T>> {
    let requester = bearer_requester(state, headers)?;
    let nonce = headers
        .get(NONCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.nonces.verify(nonce, action, requester.id) {
        debug!(action, requester = requester.id, "nonce rejected");
        return Err(reject(StatusCode::FORBIDDEN, "invalid or expired nonce"));
    }
    Ok(requester)
}

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Issue a nonce for one action; bearer token only.
pub async fn nonce_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NonceQuery>,
) -> Reply<NonceResponse> {
    let requester = match bearer_requester(&state, &headers) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    if !actions::ALL.contains(&query.action.as_str()) {
        return reject(StatusCode::BAD_REQUEST, "unknown action");
    }
    let nonce = state.nonces.create(&query.action, requester.id);
    (StatusCode::OK, Json(Envelope::ok(NonceResponse { nonce })))
}

#[instrument(skip(state, headers))]
pub async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Reply<Generation> {
    let requester = match authorize(&state, &headers, actions::GENERATE) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    respond(state.generator.generate(&requester, body.subject_id).await)
}

#[instrument(skip(state, headers, body))]
pub async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Reply<Generation> {
    let requester = match authorize(&state, &headers, actions::CHAT) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    respond(state.generator.chat(&requester, &body.message).await)
}

pub async fn test_connection_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Reply<Generation> {
    let requester = match authorize(&state, &headers, actions::TEST_CONNECTION) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    respond(state.generator.test_connection(&requester).await)
}

pub async fn clear_cache_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Reply<()> {
    let requester = match authorize(&state, &headers, actions::CLEAR_CACHE) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    respond(state.generator.clear_cache(&requester).await)
}

pub async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Reply<DailyStats> {
    let requester = match authorize(&state, &headers, actions::STATS) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    respond(state.generator.daily_stats(&requester, date).await)
}

pub async fn errors_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ErrorsQuery>,
) -> Reply<Vec<UsageLogEntry>> {
    let requester = match authorize(&state, &headers, actions::ERRORS) {
        Ok(r) => r,
        Err(reply) => return reply,
    };
    respond(state.generator.recent_errors(&requester, query.limit()).await)
}
