//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the landing page and the compiler API under a single
//! Axum router. The landing page is rendered through Leptos SSR on every
//! request; the API routes are JSON in, JSON out.

pub mod compiler;
pub mod graph;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(landing))
        .route("/healthz", get(healthz))
        .route("/api/hpm-dl/check", post(compiler::check))
        .route("/api/hpm-dl/compile", post(compiler::compile))
        .route("/api/hpm-dl/evaluate", post(compiler::evaluate))
        .route("/api/axiom-graph", post(graph::axiom_graph))
        .route("/api/axiom-graph/graphml", post(graph::axiom_graph_graphml))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn landing() -> Html<String> {
    Html(client::pages::landing::render_landing())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
