use super::*;
use crate::parse::{parse, parse_expression};
use crate::error::ErrorCode;
use crate::typecheck::TypeChecker;

fn expand(source: &str) -> Result<ExpandedProgram, SemanticError> {
    let checked = TypeChecker::new().typecheck(&parse(source).unwrap()).unwrap();
    SemanticAnalyzer::new().expand_axioms(&checked)
}

fn fold(source: &str) -> Option<f64> {
    fold_constant(&parse_expression(source).unwrap())
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("expression should fold");
    assert!((actual - expected).abs() < 1e-12, "expected {expected}, got {actual}");
}

// =============================================================================
// AXIOM EXPANSION
// =============================================================================

#[test]
fn expand_inlines_referenced_axioms() {
    let expanded = expand("axiom e: H * psi\naxiom conserved: e - lambda * psi").unwrap();
    let conserved = &expanded.expanded_axioms[1];
    assert_eq!(conserved.name, "conserved");
    assert_eq!(conserved.expression, parse_expression("(H * psi) - lambda * psi").unwrap());
}

#[test]
fn expand_is_transitive_regardless_of_declaration_order() {
    let expanded = expand("axiom top: mid + 1\naxiom mid: leaf * 2\naxiom leaf: x").unwrap();
    assert_eq!(expanded.axiom_order, vec!["leaf", "mid", "top"]);
    assert_eq!(expanded.expanded_axioms[0].expression, parse_expression("x * 2 + 1").unwrap());
    // Declaration order is kept for the expanded list.
    let names: Vec<&str> = expanded.expanded_axioms.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["top", "mid", "leaf"]);
}

#[test]
fn expand_keeps_metadata_and_program() {
    let expanded = expand("axiom a: 1 tags [t] safety dangerous\nconstraint c: entropy_bound 2").unwrap();
    assert_eq!(expanded.expanded_axioms[0].metadata.tags, vec!["t"]);
    assert_eq!(expanded.expanded_axioms[0].metadata.safety_level, crate::ast::SafetyLevel::Dangerous);
    assert_eq!(expanded.program.constraints.len(), 1);
}

#[test]
fn expand_substitutes_inside_function_arguments() {
    let expanded = expand("axiom a: 2\naxiom b: sqrt(a) + trace rho").unwrap();
    assert_eq!(expanded.expanded_axioms[1].expression, parse_expression("sqrt(2) + trace rho").unwrap());
}

#[test]
fn expand_rejects_cycles() {
    let err = expand("axiom a: b + 1\naxiom b: a").unwrap_err();
    assert_eq!(err, SemanticError::CyclicAxiom { chain: vec!["a".into(), "b".into(), "a".into()] });
}

#[test]
fn expand_rejects_self_reference() {
    assert!(matches!(expand("axiom a: a * 2"), Err(SemanticError::CyclicAxiom { .. })));
}

fn doubling_chain(levels: usize) -> String {
    let mut source = String::from("axiom a0: x\n");
    for i in 1..=levels {
        source.push_str(&format!("axiom a{i}: a{} + a{}\n", i - 1, i - 1));
    }
    source
}

#[test]
fn expand_within_budget_succeeds() {
    let expanded = expand(&doubling_chain(10)).unwrap();
    assert_eq!(expanded.expanded_axioms.len(), 11);
}

#[test]
fn expand_rejects_exponential_growth() {
    let err = expand(&doubling_chain(25)).unwrap_err();
    // a0..a16 fit in the node budget; a17 pushes the total over it.
    assert_eq!(
        err,
        SemanticError::ExpansionTooLarge { axiom: "a17".into(), measure: "nodes", limit: MAX_EXPANDED_NODES }
    );
    assert_eq!(err.error_code(), "E_EXPANSION_TOO_LARGE");
}

#[test]
fn expand_rejects_deep_reference_chains() {
    let mut source = String::from("axiom a0: x\n");
    for i in 1..=600 {
        source.push_str(&format!("axiom a{i}: -a{}\n", i - 1));
    }
    let err = expand(&source).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::ExpansionTooLarge { ref axiom, limit: MAX_EXPANDED_DEPTH, .. } if axiom == "a512"
    ));
}

// =============================================================================
// CONSTANT FOLDING
// =============================================================================

#[test]
fn fold_arithmetic() {
    assert_close(fold("1 + 2 * 3 - 4 / 2"), 5.0);
    assert_close(fold("2 ^ 3 ^ 2"), 512.0);
    assert_close(fold("-2 ^ 2"), -4.0);
    assert_close(fold("(1 + 1) ^ 0.5"), std::f64::consts::SQRT_2);
}

#[test]
fn fold_functions() {
    assert_close(fold("sqrt(16)"), 4.0);
    assert_close(fold("exp(0)"), 1.0);
    assert_close(fold("ln(1)"), 0.0);
    assert_close(fold("log(exp(2))"), 2.0);
    assert_close(fold("abs(-3)"), 3.0);
    assert_close(fold("sin(0) + cos(0) + tan(0)"), 1.0);
    assert_close(fold("min(3, 1, 2)"), 1.0);
    assert_close(fold("max(3, 7)"), 7.0);
}

#[test]
fn fold_treats_scalars_as_one_by_one_tensors() {
    assert_close(fold("2 · 3"), 6.0);
    assert_close(fold("2 ⊗ 4"), 8.0);
    assert_close(fold("trace 5 + T 1 + † 2 + conj 3"), 11.0);
    assert_eq!(fold("2 x 3"), None);
}

#[test]
fn fold_rejects_non_constants() {
    assert_eq!(fold("1 + lambda"), None);
    assert_eq!(fold("unknown(1)"), None);
    assert_eq!(fold("sqrt(1, 2)"), None);
    assert_eq!(fold("min()"), None);
}

#[test]
fn fold_rejects_non_finite_results() {
    assert_eq!(fold("1 / 0"), None);
    assert_eq!(fold("ln(0)"), None);
    assert_eq!(fold("sqrt(-1)"), None);
}
