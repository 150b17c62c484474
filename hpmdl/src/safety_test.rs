use super::*;
use crate::parse::parse;

fn program(source: &str) -> Program {
    parse(source).unwrap()
}

// =============================================================================
// HUMAN-FORCE GATES
// =============================================================================

#[test]
fn gates_from_constraints_and_axiom_safety_levels() {
    let p = program(
        r"
        axiom calm: 1
        axiom edgy: 2 safety requires_human_force
        axiom wild: 3 safety dangerous
        constraint surgery_gate: human_force_gate S
        ",
    );
    let report = SafetyChecker::new().check_human_force_gates(&p);
    let gated: Vec<&str> = report.human_force_gates.iter().map(|g| g.operator_name.as_str()).collect();
    assert_eq!(gated, vec!["surgery_gate", "edgy", "wild"]);
    assert!(report.human_force_gates.iter().all(|g| g.required_approval));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].severity, Severity::High);
    assert!(report.warnings[0].message.contains("wild"));
    assert!(report.is_safe());
}

// =============================================================================
// ENTROPY
// =============================================================================

#[test]
fn entropy_estimate_is_best_bipartite_cut() {
    let p = program("state psi: mps [2, 2, 2, 2]");
    let report = SafetyChecker::new().check_entropy_blowup(&p);
    assert!((report.estimated_entropy - 2.0 * 2f64.ln()).abs() < 1e-12);
    assert_eq!(report.threshold, None);
    assert!(report.safe);
}

#[test]
fn entropy_estimate_for_uneven_sites() {
    // Cuts give min(ln2, ln24), min(ln6, ln8), min(ln48, 0): best is ln 6.
    assert!((max_bipartite_entropy(&[2, 3, 8]) - 6f64.ln()).abs() < 1e-12);
    assert!(max_bipartite_entropy(&[]).abs() < f64::EPSILON);
    assert!(max_bipartite_entropy(&[16]).abs() < f64::EPSILON);
}

#[test]
fn entropy_uses_tightest_constant_bound() {
    let p = program(
        r"
        state psi: mps [2, 2, 2, 2]
        constraint loose: entropy_bound 10
        constraint tight: entropy_bound 1
        constraint symbolic: entropy_bound S_max
        ",
    );
    let report = SafetyChecker::new().check_entropy_blowup(&p);
    assert_eq!(report.threshold, Some(1.0));
    assert!(!report.safe);
}

#[test]
fn entropy_without_state_is_zero() {
    let p = program("constraint b: entropy_bound 0");
    let report = SafetyChecker::new().check_entropy_blowup(&p);
    assert!(report.estimated_entropy.abs() < f64::EPSILON);
    assert!(report.safe);
}

// =============================================================================
// ANOMALIES
// =============================================================================

#[test]
fn anomalies_locate_out_of_range_entries() {
    let p = program(
        r"
        operator H: hamiltonian { matrix(2, 2, dense) = [[1, -50], [-50, 2]] }
        operator D: dissipative { matrix(1, 3, sparse) = [[0, 0, 11]] }
        constraint stable: stability_threshold 2 * 5
        ",
    );
    let report = SafetyChecker::new().check_anomaly_thresholds(&p);
    assert_eq!(report.threshold, Some(10.0));
    let locations: Vec<&str> = report.anomalies.iter().map(|a| a.location.as_str()).collect();
    assert_eq!(locations, vec!["H[0,1]", "H[1,0]", "D[0,2]"]);
    assert!((report.anomalies[0].value + 50.0).abs() < f64::EPSILON);
}

#[test]
fn anomalies_need_a_threshold() {
    let p = program("operator H: hamiltonian { matrix(1, 1, dense) = [[1e9]] }");
    let report = SafetyChecker::new().check_anomaly_thresholds(&p);
    assert_eq!(report.threshold, None);
    assert!(report.anomalies.is_empty());
}

// =============================================================================
// TOPOLOGY
// =============================================================================

#[test]
fn topology_throttle_counts_mutation_operators() {
    let p = program(
        r#"
        operator S1: topological_mutation { cuda_kernel("cut") }
        operator S2: topological_mutation { cuda_kernel("glue") }
        operator H: hamiltonian { matrix(1, 1, dense) = [[1]] }
        constraint throttle: topology_surgery_threshold 1.9
        "#,
    );
    let report = SafetyChecker::new().check_topology_surgery_throttle(&p);
    assert_eq!(report, TopologyReport { surgery_count: 2, throttle_limit: Some(1), safe: false });
}

#[test]
fn topology_without_throttle_is_safe() {
    let p = program(r#"operator S: topological_mutation { cuda_kernel("cut") }"#);
    let report = SafetyChecker::new().check_topology_surgery_throttle(&p);
    assert_eq!(report, TopologyReport { surgery_count: 1, throttle_limit: None, safe: true });
}

// =============================================================================
// AGGREGATE
// =============================================================================

#[test]
fn check_all_collects_every_finding() {
    let p = program(
        r#"
        operator H: hamiltonian { matrix(2, 2, dense) = [[1, 99], [99, 1]] }
        operator S: topological_mutation { cuda_kernel("cut") }
        state psi: mps [2, 2]
        axiom risky: H safety dangerous
        constraint bound: entropy_bound 0.1
        constraint stable: stability_threshold 50
        constraint throttle: topology_surgery_threshold 0
        constraint symbolic: stability_threshold limit
        constraint gate: human_force_gate S
        "#,
    );
    let report = SafetyChecker::new().check_all(&p);
    assert!(!report.is_safe());

    let codes: Vec<SafetyErrorCode> = report.errors.iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        vec![
            SafetyErrorCode::EntropyBlowup,
            SafetyErrorCode::AnomalyThresholdExceeded,
            SafetyErrorCode::AnomalyThresholdExceeded,
            SafetyErrorCode::TopologySurgeryThrottleExceeded,
        ]
    );
    assert_eq!(report.human_force_gates.len(), 2);

    let severities: Vec<Severity> = report.warnings.iter().map(|w| w.severity).collect();
    assert_eq!(severities, vec![Severity::High, Severity::Low]);
    assert!(report.warnings[1].message.contains("symbolic"));
}

#[test]
fn check_all_on_clean_program_is_safe() {
    let p = program(
        r"
        operator H: hamiltonian { matrix(2, 2, dense) = [[1, 0], [0, 1]] }
        state psi: dense [2] hamiltonian = H
        constraint bound: entropy_bound 5
        constraint stable: stability_threshold 2
        ",
    );
    let report = SafetyChecker::new().check_all(&p);
    assert_eq!(report, SafetyReport::default());
}
