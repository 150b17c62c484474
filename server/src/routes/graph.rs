//! Axiom graph routes.
//!
//! These only parse the program: the graph is a view of declared axioms, so
//! a program with type errors elsewhere can still be inspected. Cycles are
//! reported as `E_CYCLIC_AXIOM`.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use hpmdl::AxiomGraph;
use hpmdl::error::CompileError;
use hpmdl::graph::{AxiomEdge, AxiomNode};
use serde::{Deserialize, Serialize};

use super::compiler::{ApiError, SourceBody, ensure_source_size};
use crate::state::AppState;

#[derive(Serialize, Deserialize)]
pub struct AxiomGraphResponse {
    pub nodes: Vec<AxiomNode>,
    pub edges: Vec<AxiomEdge>,
    /// Dependencies first.
    pub order: Vec<String>,
}

fn build_graph(state: &AppState, source: &str) -> Result<AxiomGraph, ApiError> {
    ensure_source_size(state, source)?;
    let program = hpmdl::parse(source).map_err(CompileError::from)?;
    Ok(AxiomGraph::from_program(&program))
}

/// `POST /api/axiom-graph`: nodes, edges and a topological order.
pub async fn axiom_graph(
    State(state): State<AppState>,
    Json(body): Json<SourceBody>,
) -> Result<Json<AxiomGraphResponse>, ApiError> {
    let graph = build_graph(&state, &body.source)?;
    let order = graph.topological_order().map_err(CompileError::from)?;

    Ok(Json(AxiomGraphResponse { nodes: graph.nodes, edges: graph.edges, order }))
}

/// `POST /api/axiom-graph/graphml`: the same graph as a GraphML document.
pub async fn axiom_graph_graphml(
    State(state): State<AppState>,
    Json(body): Json<SourceBody>,
) -> Result<Response, ApiError> {
    let graph = build_graph(&state, &body.source)?;
    Ok(([(CONTENT_TYPE, "application/graphml+xml; charset=utf-8")], graph.to_graphml()).into_response())
}
