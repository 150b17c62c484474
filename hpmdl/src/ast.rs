//! AST types for HPM-DL programs.

use serde::{Deserialize, Serialize};

/// A parsed HPM-DL program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub axioms: Vec<Axiom>,
    pub operators: Vec<Operator>,
    pub initial_state: Option<InitialState>,
    pub constraints: Vec<Constraint>,
}

impl Program {
    /// Look up an axiom by name.
    #[must_use]
    pub fn axiom(&self, name: &str) -> Option<&Axiom> {
        self.axioms.iter().find(|a| a.name == name)
    }

    /// Look up an operator by name.
    #[must_use]
    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.operators.iter().find(|o| o.name == name)
    }
}

/// `axiom <name>: <expr> [tags [...]] [safety <level>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axiom {
    pub name: String,
    pub expression: Expression,
    pub metadata: AxiomMetadata,
}

/// Description, tags and safety marking attached to an axiom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxiomMetadata {
    #[serde(default)]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub safety_level: SafetyLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    #[default]
    Safe,
    RequiresHumanForce,
    Dangerous,
}

impl SafetyLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::RequiresHumanForce => "requires_human_force",
            Self::Dangerous => "dangerous",
        }
    }
}

/// `operator <name>: <kind> { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub operator_type: OperatorType,
    pub spec: OperatorSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorType {
    Hamiltonian,
    Dissipative,
    TopologicalMutation,
    EntropyFlow,
}

impl OperatorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hamiltonian => "hamiltonian",
            Self::Dissipative => "dissipative",
            Self::TopologicalMutation => "topological_mutation",
            Self::EntropyFlow => "entropy_flow",
        }
    }
}

/// The implementation items declared in an operator body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub matrix_representation: Option<MatrixSpec>,
    pub tensor_network: Option<TensorNetworkSpec>,
    pub gpu_kernel: Option<String>,
}

impl OperatorSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrix_representation.is_none() && self.tensor_network.is_none() && self.gpu_kernel.is_none()
    }
}

/// `matrix(rows, cols, dense|sparse) = [[...], ...]`
///
/// `data` is row-major. `row_lengths` records the literal shape so the
/// typechecker can reject ragged rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSpec {
    pub rows: usize,
    pub cols: usize,
    pub sparse: bool,
    pub data: Vec<f64>,
    pub row_lengths: Vec<usize>,
}

/// `tensor_net(kind, [bond dims], trunc(...))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorNetworkSpec {
    pub network_type: TensorNetworkType,
    pub bond_dimensions: Vec<usize>,
    pub truncation: Option<TruncationSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorNetworkType {
    Mps,
    Peps,
    Mera,
}

impl TensorNetworkType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mps => "mps",
            Self::Peps => "peps",
            Self::Mera => "mera",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncationSpec {
    pub method: TruncationMethod,
    pub max_bond_dim: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationMethod {
    Svd,
    Qr,
    Rg,
}

impl TruncationMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svd => "svd",
            Self::Qr => "qr",
            Self::Rg => "rg",
        }
    }
}

/// `state <name>: <repr> [dims] [hamiltonian = H] [topology { ... }]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub name: String,
    pub psi_0: StateSpec,
    /// Name of the hamiltonian operator driving the evolution, if any.
    pub hamiltonian: Option<String>,
    pub topology_constraints: Vec<TopologyConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub representation: StateRepresentation,
    pub dimensions: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRepresentation {
    Mps,
    Peps,
    Dense,
    Sparse,
}

impl StateRepresentation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mps => "mps",
            Self::Peps => "peps",
            Self::Dense => "dense",
            Self::Sparse => "sparse",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyConstraint {
    pub betti_numbers: Option<Vec<usize>>,
    pub homology_generators: Option<Vec<HomologyGenerator>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomologyGenerator {
    pub dimension: usize,
    pub representation: String,
}

/// `constraint <name>: <kind> <expr>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub expression: Expression,
    pub constraint_type: ConstraintType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    EntropyBound,
    StabilityThreshold,
    TopologySurgeryThreshold,
    HumanForceGate,
}

impl ConstraintType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntropyBound => "entropy_bound",
            Self::StabilityThreshold => "stability_threshold",
            Self::TopologySurgeryThreshold => "topology_surgery_threshold",
            Self::HumanForceGate => "human_force_gate",
        }
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Variable(String),
    Constant(f64),
    BinaryOp { op: BinaryOp, left: Box<Expression>, right: Box<Expression> },
    UnaryOp { op: UnaryOp, expr: Box<Expression> },
    FunctionCall { name: String, args: Vec<Expression> },
}

impl Expression {
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::BinaryOp { op, left: Box::new(left), right: Box::new(right) }
    }

    #[must_use]
    pub fn unary(op: UnaryOp, expr: Expression) -> Self {
        Self::UnaryOp { op, expr: Box::new(expr) }
    }

    /// Identifiers referenced as variables, in first-seen order, without duplicates.
    /// Function names are not included.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Self::Variable(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Self::Constant(_) => {}
            Self::BinaryOp { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Self::UnaryOp { expr, .. } => expr.collect_variables(out),
            Self::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Dot,
    Cross,
    /// `⊗`, `otimes`, `tensor`
    Tensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Transpose,
    Conjugate,
    /// `†`, `dagger`: conjugate transpose.
    Dagger,
    Trace,
}
