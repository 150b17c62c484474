//! HPM-DL compiler routes.
//!
//! Every handler takes a JSON body with the program `source`, runs the
//! compiler synchronously and maps `CompileError` through
//! `compile_error_to_status`. Error bodies are `{ "code", "message" }`.

use std::collections::{BTreeMap, BTreeSet};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hpmdl::codegen::{JobDescriptor, NumericOperatorSpecs, OperatorCatalog};
use hpmdl::error::{CompileError, ErrorCode};
use hpmdl::ir::IrProgram;
use hpmdl::safety::SafetyReport;
use hpmdl::typecheck::SymbolKind;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

/// Structured API error rendered as `{ "code", "message" }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody { code: self.code, message: &self.message };
        (self.status, Json(body)).into_response()
    }
}

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        let status = compile_error_to_status(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "compile request failed");
        } else {
            tracing::debug!(error = %err, code = err.error_code(), "rejected program");
        }
        Self { status, code: err.error_code(), message: err.to_string() }
    }
}

pub(crate) fn compile_error_to_status(err: &CompileError) -> StatusCode {
    match err {
        CompileError::Parse(_) | CompileError::Type(_) | CompileError::Semantic(_) | CompileError::Lower(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CompileError::Package(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Reject sources above the configured byte limit.
pub(crate) fn ensure_source_size(state: &AppState, source: &str) -> Result<(), ApiError> {
    let limit = state.config.max_source_bytes;
    if source.len() > limit {
        return Err(ApiError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "E_SOURCE_TOO_LARGE",
            message: format!("source is {} bytes, limit is {limit}", source.len()),
        });
    }
    Ok(())
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Deserialize)]
pub struct SourceBody {
    pub source: String,
}

#[derive(Deserialize)]
pub struct ExpressionBody {
    pub expression: String,
}

#[derive(Serialize, Deserialize)]
pub struct CheckResponse {
    pub symbols: BTreeMap<String, SymbolKind>,
    pub free_variables: BTreeSet<String>,
    pub axiom_order: Vec<String>,
    pub safety: SafetyReport,
}

#[derive(Serialize, Deserialize)]
pub struct CompileResponse {
    pub ir: IrProgram,
    pub catalog: OperatorCatalog,
    pub numeric_specs: NumericOperatorSpecs,
    pub job: JobDescriptor,
    pub safety: SafetyReport,
}

#[derive(Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub value: Option<f64>,
    pub variables: Vec<String>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/hpm-dl/check`: typecheck and safety-check without codegen.
pub async fn check(State(state): State<AppState>, Json(body): Json<SourceBody>) -> Result<Json<CheckResponse>, ApiError> {
    ensure_source_size(&state, &body.source)?;
    let report = hpmdl::check(&body.source)?;

    Ok(Json(CheckResponse {
        symbols: report.type_info.symbols,
        free_variables: report.type_info.free_variables,
        axiom_order: report.axiom_order,
        safety: report.safety,
    }))
}

/// `POST /api/hpm-dl/compile`: full pipeline using the server's evolution parameters.
pub async fn compile(
    State(state): State<AppState>,
    Json(body): Json<SourceBody>,
) -> Result<Json<CompileResponse>, ApiError> {
    ensure_source_size(&state, &body.source)?;
    let artifacts = hpmdl::compile(&body.source, &state.config.compiler)?;
    tracing::info!(job_id = %artifacts.job.job_id, safe = artifacts.safety.is_safe(), "compile request served");

    Ok(Json(CompileResponse {
        ir: artifacts.ir,
        catalog: artifacts.catalog,
        numeric_specs: artifacts.numeric_specs,
        job: artifacts.job,
        safety: artifacts.safety,
    }))
}

/// `POST /api/hpm-dl/evaluate`: fold a single expression to a constant when possible.
pub async fn evaluate(
    State(state): State<AppState>,
    Json(body): Json<ExpressionBody>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    ensure_source_size(&state, &body.expression)?;
    let expr = hpmdl::parse_expression(&body.expression).map_err(CompileError::from)?;

    Ok(Json(EvaluateResponse { value: hpmdl::fold_constant(&expr), variables: expr.variables() }))
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
