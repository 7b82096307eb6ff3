//! Route definitions for the BodaSafe Shield quote server

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// HTML quote form routes
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::quote_page))
        .route("/quote", post(handlers::submit_quote))
}

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/quotes", post(handlers::create_quote))
        .route("/model", get(handlers::get_model_info))
}
