//! Safety checks: human-force gates, entropy blowup, anomaly thresholds and
//! the topology surgery throttle.
//!
//! DESIGN
//! ======
//! Thresholds come from `constraint` declarations. When several constraints
//! of one kind exist, the tightest (smallest) constant wins. A threshold whose
//! expression does not fold to a constant is skipped with a low-severity
//! warning rather than failing the check.

use serde::{Deserialize, Serialize};

use crate::ast::{ConstraintType, OperatorType, Program, SafetyLevel};
use crate::semantic::fold_constant;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub human_force_gates: Vec<HumanForceGate>,
    pub warnings: Vec<SafetyWarning>,
    pub errors: Vec<SafetyError>,
}

impl SafetyReport {
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanForceGate {
    /// Constraint or axiom that requires approval.
    pub operator_name: String,
    pub reason: String,
    pub required_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyWarning {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyError {
    pub message: String,
    pub code: SafetyErrorCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyErrorCode {
    EntropyBlowup,
    AnomalyThresholdExceeded,
    TopologySurgeryThrottleExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyReport {
    /// Upper bound on bipartite entanglement entropy (nats) of the initial state.
    pub estimated_entropy: f64,
    pub threshold: Option<f64>,
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<Anomaly>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub location: String,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub surgery_count: usize,
    pub throttle_limit: Option<usize>,
    pub safe: bool,
}

#[derive(Debug, Default)]
pub struct SafetyChecker;

impl SafetyChecker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Collect every construct that needs explicit human approval.
    #[must_use]
    pub fn check_human_force_gates(&self, program: &Program) -> SafetyReport {
        let mut report = SafetyReport::default();

        for c in program.constraints.iter().filter(|c| c.constraint_type == ConstraintType::HumanForceGate) {
            report.human_force_gates.push(HumanForceGate {
                operator_name: c.name.clone(),
                reason: "marked as human_force_gate".to_owned(),
                required_approval: true,
            });
        }

        for axiom in &program.axioms {
            match axiom.metadata.safety_level {
                SafetyLevel::Safe => {}
                SafetyLevel::RequiresHumanForce => report.human_force_gates.push(HumanForceGate {
                    operator_name: axiom.name.clone(),
                    reason: "axiom marked requires_human_force".to_owned(),
                    required_approval: true,
                }),
                SafetyLevel::Dangerous => {
                    report.human_force_gates.push(HumanForceGate {
                        operator_name: axiom.name.clone(),
                        reason: "axiom marked dangerous".to_owned(),
                        required_approval: true,
                    });
                    report.warnings.push(SafetyWarning {
                        message: format!("axiom {} is marked dangerous", axiom.name),
                        severity: Severity::High,
                    });
                }
            }
        }

        report
    }

    /// Compare the entanglement entropy bound of the initial state against
    /// the tightest `entropy_bound` constraint.
    #[must_use]
    pub fn check_entropy_blowup(&self, program: &Program) -> EntropyReport {
        let estimated_entropy = program
            .initial_state
            .as_ref()
            .map_or(0.0, |s| max_bipartite_entropy(&s.psi_0.dimensions));
        let threshold = tightest_threshold(program, ConstraintType::EntropyBound);
        let safe = threshold.is_none_or(|t| estimated_entropy <= t);
        EntropyReport { estimated_entropy, threshold, safe }
    }

    /// Flag operator matrix entries whose magnitude exceeds the tightest
    /// `stability_threshold`.
    #[must_use]
    pub fn check_anomaly_thresholds(&self, program: &Program) -> AnomalyReport {
        let threshold = tightest_threshold(program, ConstraintType::StabilityThreshold);
        let Some(limit) = threshold else {
            return AnomalyReport { anomalies: Vec::new(), threshold };
        };

        let mut anomalies = Vec::new();
        for op in &program.operators {
            let Some(m) = &op.spec.matrix_representation else {
                continue;
            };
            for (i, &value) in m.data.iter().enumerate() {
                if value.abs() > limit {
                    let (row, col) = if m.cols == 0 { (0, i) } else { (i / m.cols, i % m.cols) };
                    anomalies.push(Anomaly { location: format!("{}[{row},{col}]", op.name), value, threshold: limit });
                }
            }
        }

        AnomalyReport { anomalies, threshold }
    }

    /// Count topological mutation operators against the surgery throttle.
    #[must_use]
    pub fn check_topology_surgery_throttle(&self, program: &Program) -> TopologyReport {
        let surgery_count = program
            .operators
            .iter()
            .filter(|o| o.operator_type == OperatorType::TopologicalMutation)
            .count();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let throttle_limit =
            tightest_threshold(program, ConstraintType::TopologySurgeryThreshold).map(|t| t.max(0.0).floor() as usize);
        let safe = throttle_limit.is_none_or(|limit| surgery_count <= limit);
        TopologyReport { surgery_count, throttle_limit, safe }
    }

    /// Run every check and fold the results into one report.
    #[must_use]
    pub fn check_all(&self, program: &Program) -> SafetyReport {
        let mut report = self.check_human_force_gates(program);

        for c in &program.constraints {
            if c.constraint_type != ConstraintType::HumanForceGate && fold_constant(&c.expression).is_none() {
                report.warnings.push(SafetyWarning {
                    message: format!("constraint {} is not a constant; threshold ignored", c.name),
                    severity: Severity::Low,
                });
            }
        }

        let entropy = self.check_entropy_blowup(program);
        if let (false, Some(threshold)) = (entropy.safe, entropy.threshold) {
            report.errors.push(SafetyError {
                message: format!(
                    "estimated entropy {:.4} exceeds entropy bound {threshold}",
                    entropy.estimated_entropy
                ),
                code: SafetyErrorCode::EntropyBlowup,
            });
        }

        let anomalies = self.check_anomaly_thresholds(program);
        for a in &anomalies.anomalies {
            report.errors.push(SafetyError {
                message: format!("{} = {} exceeds stability threshold {}", a.location, a.value, a.threshold),
                code: SafetyErrorCode::AnomalyThresholdExceeded,
            });
        }

        let topology = self.check_topology_surgery_throttle(program);
        if let (false, Some(limit)) = (topology.safe, topology.throttle_limit) {
            report.errors.push(SafetyError {
                message: format!("{} topology surgeries exceed throttle limit {limit}", topology.surgery_count),
                code: SafetyErrorCode::TopologySurgeryThrottleExceeded,
            });
        }

        if !report.errors.is_empty() {
            tracing::warn!(errors = report.errors.len(), "safety check failed");
        }
        report
    }
}

/// Smallest constant value among constraints of `kind`.
fn tightest_threshold(program: &Program, kind: ConstraintType) -> Option<f64> {
    program
        .constraints
        .iter()
        .filter(|c| c.constraint_type == kind)
        .filter_map(|c| fold_constant(&c.expression))
        .reduce(f64::min)
}

/// `max_k min(ln d_0..d_k, ln d_k..d_n)`: the largest entanglement entropy any
/// single cut of the site chain can carry.
fn max_bipartite_entropy(dims: &[usize]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let logs: Vec<f64> = dims.iter().map(|&d| (d.max(1) as f64).ln()).collect();
    let total: f64 = logs.iter().sum();

    let mut left = 0.0;
    let mut best: f64 = 0.0;
    for l in &logs {
        left += l;
        best = best.max(left.min(total - left));
    }
    best
}

#[cfg(test)]
#[path = "safety_test.rs"]
mod tests;
