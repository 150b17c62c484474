use super::*;

use hpmdl::error::{PackageError, ParseError, Position};
use serde_json::json;

use crate::config::ServerConfig;
use crate::routes::app;
use crate::routes::tests::{QUBIT_CHAIN, post_json, test_app};

#[test]
fn compile_error_status_mapping() {
    let parse = CompileError::Parse(ParseError::UnterminatedString { pos: Position { line: 1, col: 1 } });
    assert_eq!(compile_error_to_status(&parse), StatusCode::UNPROCESSABLE_ENTITY);

    let package = CompileError::Package(PackageError::Io {
        path: "out".into(),
        source: std::io::Error::other("disk full"),
    });
    assert_eq!(compile_error_to_status(&package), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// check
// =============================================================================

#[tokio::test]
async fn check_reports_symbols_and_free_variables() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/check", json!({ "source": QUBIT_CHAIN })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbols"]["H"], "operator");
    assert_eq!(body["symbols"]["energy"], "axiom");
    assert_eq!(body["free_variables"], json!(["E"]));
    assert_eq!(body["axiom_order"], json!(["energy", "conserved"]));
    assert_eq!(body["safety"]["human_force_gates"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn check_returns_parse_error_body() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/check", json!({ "source": "axiom : 1" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_PARSE");
    assert!(body["message"].as_str().unwrap().starts_with("parse error: 1:"));
}

// =============================================================================
// compile
// =============================================================================

#[tokio::test]
async fn compile_returns_artifacts() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/compile", json!({ "source": QUBIT_CHAIN })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ir"]["entry_point"], "main");
    assert_eq!(body["catalog"]["operators"].as_array().unwrap().len(), 1);
    assert_eq!(body["numeric_specs"]["specs"].as_array().unwrap().len(), 1);
    assert!(body["job"]["job_id"].is_string());
    assert!(body["safety"]["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn compile_type_error_is_unprocessable() {
    let source = "operator H: hamiltonian { matrix(1, 2, dense) = [[1, 2]] }";
    let (status, body) = post_json(test_app(), "/api/hpm-dl/compile", json!({ "source": source })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_DIMENSION");
}

#[tokio::test]
async fn compile_rejects_oversized_source() {
    let config = ServerConfig { max_source_bytes: 16, ..ServerConfig::default() };
    let router = app(AppState::new(config));
    let (status, body) = post_json(router, "/api/hpm-dl/compile", json!({ "source": QUBIT_CHAIN })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "E_SOURCE_TOO_LARGE");
}

// =============================================================================
// evaluate
// =============================================================================

#[tokio::test]
async fn evaluate_folds_constants() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/evaluate", json!({ "expression": "-2^2 + max(1, 3)" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], json!(-1.0));
    assert_eq!(body["variables"], json!([]));
}

#[tokio::test]
async fn evaluate_with_variables_has_no_value() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/evaluate", json!({ "expression": "H · psi + H" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["value"].is_null());
    assert_eq!(body["variables"], json!(["H", "psi"]));
}

#[tokio::test]
async fn evaluate_parse_error() {
    let (status, body) = post_json(test_app(), "/api/hpm-dl/evaluate", json!({ "expression": "(1 +" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_PARSE");
}

// =============================================================================
// resource limits
// =============================================================================

#[tokio::test]
async fn evaluate_rejects_deep_nesting_without_crashing() {
    let expression = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
    let (status, body) = post_json(test_app(), "/api/hpm-dl/evaluate", json!({ "expression": expression })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_PARSE");
}

#[tokio::test]
async fn check_rejects_exponential_expansion() {
    let mut source = String::from("axiom a0: x\n");
    for i in 1..=25 {
        source.push_str(&format!("axiom a{i}: a{} + a{}\n", i - 1, i - 1));
    }
    let (status, body) = post_json(test_app(), "/api/hpm-dl/check", json!({ "source": source })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E_EXPANSION_TOO_LARGE");
}
