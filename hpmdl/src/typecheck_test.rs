use super::*;
use crate::error::ErrorCode;
use crate::parse::parse;

fn check(source: &str) -> Result<TypeCheckedProgram, TypeError> {
    TypeChecker::new().typecheck(&parse(source).unwrap())
}

#[test]
fn typecheck_builds_symbol_table_and_free_variables() {
    let input = r"
        operator H: hamiltonian { matrix(2, 2, dense) = [[1, 0], [0, -1]] }
        state psi: dense [2] hamiltonian = H
        axiom a: H * psi + lambda
        axiom b: a - mu
        constraint gate: human_force_gate H
    ";
    let checked = check(input).unwrap();
    let symbols = &checked.type_info.symbols;
    assert_eq!(symbols.get("H"), Some(&SymbolKind::Operator));
    assert_eq!(symbols.get("psi"), Some(&SymbolKind::State));
    assert_eq!(symbols.get("a"), Some(&SymbolKind::Axiom));
    assert_eq!(symbols.get("gate"), Some(&SymbolKind::Constraint));
    let free: Vec<&str> = checked.type_info.free_variables.iter().map(String::as_str).collect();
    assert_eq!(free, vec!["lambda", "mu"]);
}

#[test]
fn duplicate_names_across_namespaces() {
    let err = check("axiom E: 1\nconstraint E: entropy_bound 2").unwrap_err();
    assert_eq!(err, TypeError::DuplicateName { name: "E".into(), first: "axiom", second: "constraint" });
    assert_eq!(err.error_code(), "E_DUPLICATE_NAME");
}

#[test]
fn duplicate_names_within_axioms() {
    let err = check("axiom a: 1\naxiom a: 2").unwrap_err();
    assert!(matches!(err, TypeError::DuplicateName { first: "axiom", second: "axiom", .. }));
}

#[test]
fn matrix_data_length_must_match_size() {
    let err = check("operator D: dissipative { matrix(2, 3, dense) = [[1, 2, 3]] }").unwrap_err();
    assert_eq!(err, TypeError::MatrixSize { operator: "D".into(), rows: 2, cols: 3, len: 3 });
    assert_eq!(err.error_code(), "E_MATRIX_SHAPE");
}

#[test]
fn matrix_rows_must_have_cols_entries() {
    let err = check("operator D: dissipative { matrix(2, 2, dense) = [[1, 2, 3], [4]] }").unwrap_err();
    assert_eq!(err, TypeError::RaggedRow { operator: "D".into(), row: 0, len: 3, cols: 2 });
}

#[test]
fn matrix_dimensions_must_be_non_zero() {
    let err = check("operator D: dissipative { matrix(0, 2, dense) = [[1, 2]] }").unwrap_err();
    assert_eq!(err, TypeError::EmptyMatrix { operator: "D".into() });
}

#[test]
fn hamiltonian_matrix_must_be_square() {
    let err = check("operator H: hamiltonian { matrix(1, 2, dense) = [[1, 2]] }").unwrap_err();
    assert_eq!(err, TypeError::NonSquareHamiltonian { operator: "H".into(), rows: 1, cols: 2 });
    assert_eq!(err.error_code(), "E_DIMENSION");
}

#[test]
fn non_hamiltonian_matrix_may_be_rectangular() {
    assert!(check("operator F: entropy_flow { matrix(1, 2, sparse) = [[0, 2]] }").is_ok());
}

#[test]
fn operator_needs_an_implementation() {
    let err = check("operator S: topological_mutation").unwrap_err();
    assert_eq!(err, TypeError::MissingImplementation { operator: "S".into() });
    assert_eq!(err.error_code(), "E_MISSING_IMPLEMENTATION");
}

#[test]
fn tensor_network_bond_dimensions_must_be_non_zero() {
    let err = check("operator H: hamiltonian { tensor_net(mps, [2, 0]) }").unwrap_err();
    assert!(matches!(err, TypeError::InvalidTensorNetwork { ref message, .. } if message.contains("bond")));
    assert_eq!(err.error_code(), "E_TENSOR_NETWORK");
}

#[test]
fn truncation_tolerance_must_lie_in_unit_interval() {
    for tol in ["0", "1", "1.5", "-1e-3"] {
        let source = format!("operator H: hamiltonian {{ tensor_net(mps, [2], trunc(svd, 8, {tol})) }}");
        let err = TypeChecker::new().typecheck(&parse(&source).unwrap()).unwrap_err();
        assert!(
            matches!(err, TypeError::InvalidTensorNetwork { ref message, .. } if message.contains("tolerance")),
            "tolerance {tol} should be rejected"
        );
    }
}

#[test]
fn truncation_max_bond_dim_must_be_non_zero() {
    let err = check("operator H: hamiltonian { tensor_net(mera, [2], trunc(rg, 0, 0.1)) }").unwrap_err();
    assert!(matches!(err, TypeError::InvalidTensorNetwork { ref message, .. } if message.contains("max bond")));
}

#[test]
fn state_dimension_zero_is_error() {
    let err = check("state psi: mps [2, 0, 2]").unwrap_err();
    assert_eq!(err, TypeError::ZeroDimension { state: "psi".into(), index: 1 });
    assert_eq!(err.error_code(), "E_STATE");
}

#[test]
fn state_hamiltonian_must_exist() {
    let err = check("state psi: dense [2] hamiltonian = H").unwrap_err();
    assert_eq!(err, TypeError::UnknownHamiltonian { state: "psi".into(), name: "H".into() });
    assert_eq!(err.error_code(), "E_HAMILTONIAN_REF");
}

#[test]
fn state_hamiltonian_must_be_a_hamiltonian() {
    let input = r"
        operator D: dissipative { matrix(2, 2, dense) = [[1, 0], [0, 1]] }
        state psi: dense [2] hamiltonian = D
    ";
    let err = check(input).unwrap_err();
    assert_eq!(err, TypeError::NotAHamiltonian { state: "psi".into(), name: "D".into(), kind: "dissipative" });
}

#[test]
fn state_dimension_must_match_hamiltonian_matrix() {
    let input = r"
        operator H: hamiltonian { matrix(2, 2, dense) = [[1, 0], [0, 1]] }
        state psi: mps [2, 2] hamiltonian = H
    ";
    let err = check(input).unwrap_err();
    assert_eq!(
        err,
        TypeError::DimensionMismatch { state: "psi".into(), name: "H".into(), state_dim: 4, matrix_dim: 2 }
    );
}

#[test]
fn state_dimension_not_checked_against_tensor_network_hamiltonian() {
    let input = r"
        operator H: hamiltonian { tensor_net(mps, [4, 4]) }
        state psi: mps [2, 2, 2] hamiltonian = H
    ";
    assert!(check(input).is_ok());
}

#[test]
fn homology_generator_dimension_bounded_by_betti_numbers() {
    let ok = r#"state psi: dense [2] topology { betti = [1, 1], generators = [(dim = 1, repr = "loop")] }"#;
    assert!(check(ok).is_ok());

    let bad = r#"state psi: dense [2] topology { betti = [1, 1], generators = [(dim = 2, repr = "void")] }"#;
    let err = check(bad).unwrap_err();
    assert_eq!(err, TypeError::GeneratorDimension { state: "psi".into(), dimension: 2, betti_len: 2 });
}

#[test]
fn generators_without_betti_numbers_are_accepted() {
    assert!(check(r#"state psi: dense [2] topology { generators = [(dim = 5, repr = "x")] }"#).is_ok());
}
