//! HTTP front end: intake form, form/JSON submission, health and metrics

pub mod render;
pub mod routes;

use crate::adapter::SubmissionHandler;
use crate::metrics::SubmissionMetrics;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: SubmissionHandler,
    pub metrics: Arc<SubmissionMetrics>,
}

impl AppState {
    pub fn new(handler: SubmissionHandler, metrics: Arc<SubmissionMetrics>) -> Self {
        Self { handler, metrics }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/predict", post(routes::predict_form))
        .route("/api/predict", post(routes::predict_json))
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
