//! HTTP server for the generation endpoint.
//!
//! This module provides:
//! - Bearer-token and nonce authentication (`auth`)
//! - Axum handlers wrapping [`Generator`] calls in [`Envelope`](crate::rpc::Envelope)s (`handlers`)
//! - Configuration and secrets loading for `scrivd` (`config`)
//!
//! Routes:
//!
//! | Method | Path                     | Body / query      |
//! |--------|--------------------------|-------------------|
//! | GET    | `/nonce`                 | `?action=`        |
//! | POST   | `/generate`              | `{"subjectId"}`   |
//! | POST   | `/chat`                  | `{"message"}`     |
//! | POST   | `/admin/test-connection` |                   |
//! | POST   | `/admin/clear-cache`     |                   |
//! | GET    | `/admin/stats`           | `?date=`          |
//! | GET    | `/admin/errors`          | `?limit=`         |

pub mod auth;
pub mod config;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::Generator;
use auth::{NonceSigner, TokenTable};

/// Shared state of the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    pub tokens: Arc<TokenTable>,
    pub nonces: NonceSigner,
}

impl AppState {
    pub fn new(generator: Arc<Generator>, tokens: TokenTable, nonces: NonceSigner) -> Self {
        Self {
            generator,
            tokens: Arc::new(tokens),
            nonces,
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/nonce", get(handlers::nonce_handler))
        .route("/generate", post(handlers::generate_handler))
        .route("/chat", post(handlers::chat_handler))
        .route("/admin/test-connection", post(handlers::test_connection_handler))
        .route("/admin/clear-cache", post(handlers::clear_cache_handler))
        .route("/admin/stats", get(handlers::stats_handler))
        .route("/admin/errors", get(handlers::errors_handler))
        .with_state(state)
}
