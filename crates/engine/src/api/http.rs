//! HTTP routes.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::app::App;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
