//! Operator catalog, numeric operator specs and solver job descriptors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ast::{ConstraintType, OperatorType, Program, StateRepresentation, TruncationMethod};
use crate::ir::{IrOperator, IrOperatorImplementation, IrProgram, IrTarget, IrTensorNetwork};
use crate::pipeline::CompilerOptions;

const DEFAULT_TRUNCATION: TruncationParams =
    TruncationParams { method: TruncationMethod::Svd, max_bond_dim: 64, tolerance: 1e-10 };
const SNAPSHOT_FORMAT: &str = "npy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorCatalog {
    pub operators: Vec<OperatorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorEntry {
    pub name: String,
    pub operator_type: OperatorType,
    pub target: IrTarget,
    pub implementation: String,
    pub metadata: OperatorMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMetadata {
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericOperatorSpecs {
    pub specs: Vec<NumericSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSpec {
    pub operator_name: String,
    pub numeric_representation: NumericRepresentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NumericRepresentation {
    DenseMatrix { rows: usize, cols: usize, data: Vec<f64> },
    SparseMatrix { rows: usize, cols: usize, nnz: usize, indices: Vec<(usize, usize)>, values: Vec<f64> },
    TensorNetwork { network: IrTensorNetwork },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: Uuid,
    pub entry_point: String,
    pub initial_state: Option<StateDescriptor>,
    pub operators: Vec<OperatorDescriptor>,
    pub evolution_params: EvolutionParams,
    pub output_spec: OutputSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDescriptor {
    pub name: String,
    pub representation: StateRepresentation,
    pub dimensions: Vec<usize>,
    pub hamiltonian: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub name: String,
    pub spec_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionParams {
    pub time_step: f64,
    pub max_steps: usize,
    pub tolerance: f64,
    pub truncation: TruncationParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncationParams {
    pub method: TruncationMethod,
    pub max_bond_dim: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub snapshots: Vec<SnapshotSpec>,
    pub final_certificate: bool,
    pub topology_analysis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    pub time: f64,
    pub format: String,
}

#[derive(Debug, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// One catalog entry per IR operator, tagged with its kind and target.
    /// Operators named by a `human_force_gate` constraint carry that tag too.
    #[must_use]
    pub fn generate_operator_catalog(&self, ir: &IrProgram, program: &Program) -> OperatorCatalog {
        let gated: Vec<String> = program
            .constraints
            .iter()
            .filter(|c| c.constraint_type == ConstraintType::HumanForceGate)
            .flat_map(|c| c.expression.variables())
            .collect();

        let operators = ir
            .operators()
            .map(|op| {
                let mut tags = vec![op.operator_type.as_str().to_owned(), target_str(op.spec.target).to_owned()];
                if gated.contains(&op.name) {
                    tags.push(ConstraintType::HumanForceGate.as_str().to_owned());
                }
                OperatorEntry {
                    name: op.name.clone(),
                    operator_type: op.operator_type,
                    target: op.spec.target,
                    implementation: implementation_kind(&op.spec.implementation).to_owned(),
                    metadata: OperatorMetadata { description: describe(op), tags },
                }
            })
            .collect();

        OperatorCatalog { operators }
    }

    /// Numeric forms of every operator that has one. Kernel-only operators
    /// are resolved by the runtime and have no numeric spec.
    #[must_use]
    pub fn generate_numeric_specs(&self, ir: &IrProgram) -> NumericOperatorSpecs {
        let specs = ir
            .operators()
            .filter_map(|op| {
                let numeric_representation = match &op.spec.implementation {
                    IrOperatorImplementation::DenseMatrix { rows, cols, data } => {
                        NumericRepresentation::DenseMatrix { rows: *rows, cols: *cols, data: data.clone() }
                    }
                    IrOperatorImplementation::SparseMatrix { rows, cols, indices, values } => {
                        NumericRepresentation::SparseMatrix {
                            rows: *rows,
                            cols: *cols,
                            nnz: values.len(),
                            indices: indices.clone(),
                            values: values.clone(),
                        }
                    }
                    IrOperatorImplementation::TensorNetwork { network } => {
                        NumericRepresentation::TensorNetwork { network: network.clone() }
                    }
                    IrOperatorImplementation::CudaKernel { .. } => return None,
                };
                Some(NumericSpec { operator_name: op.name.clone(), numeric_representation })
            })
            .collect();

        NumericOperatorSpecs { specs }
    }

    /// Build the descriptor the runtime uses to launch an evolution job.
    #[must_use]
    pub fn generate_job_descriptor(&self, ir: &IrProgram, program: &Program, options: &CompilerOptions) -> JobDescriptor {
        let initial_state = program.initial_state.as_ref().map(|s| StateDescriptor {
            name: s.name.clone(),
            representation: s.psi_0.representation,
            dimensions: s.psi_0.dimensions.clone(),
            hamiltonian: s.hamiltonian.clone(),
        });

        let operators = ir
            .operators()
            .map(|op| OperatorDescriptor { name: op.name.clone(), spec_ref: format!("operators.json#/{}", op.name) })
            .collect();

        let truncation = program
            .operators
            .iter()
            .find_map(|op| op.spec.tensor_network.as_ref().and_then(|n| n.truncation))
            .map_or(DEFAULT_TRUNCATION, |t| TruncationParams {
                method: t.method,
                max_bond_dim: t.max_bond_dim,
                tolerance: t.tolerance,
            });

        #[allow(clippy::cast_precision_loss)]
        let final_time = options.time_step * options.max_steps as f64;
        let snapshots = vec![
            SnapshotSpec { time: 0.0, format: SNAPSHOT_FORMAT.to_owned() },
            SnapshotSpec { time: final_time, format: SNAPSHOT_FORMAT.to_owned() },
        ];

        let topology_analysis = program.initial_state.as_ref().is_some_and(|s| !s.topology_constraints.is_empty());

        let job = JobDescriptor {
            job_id: Uuid::new_v4(),
            entry_point: ir.entry_point.clone(),
            initial_state,
            operators,
            evolution_params: EvolutionParams {
                time_step: options.time_step,
                max_steps: options.max_steps,
                tolerance: options.tolerance,
                truncation,
            },
            output_spec: OutputSpec { snapshots, final_certificate: true, topology_analysis },
        };
        tracing::info!(job_id = %job.job_id, operators = job.operators.len(), "generated job descriptor");
        job
    }
}

fn target_str(target: IrTarget) -> &'static str {
    match target {
        IrTarget::Cpu => "cpu",
        IrTarget::Gpu => "gpu",
    }
}

fn implementation_kind(implementation: &IrOperatorImplementation) -> &'static str {
    match implementation {
        IrOperatorImplementation::DenseMatrix { .. } => "dense_matrix",
        IrOperatorImplementation::SparseMatrix { .. } => "sparse_matrix",
        IrOperatorImplementation::TensorNetwork { .. } => "tensor_network",
        IrOperatorImplementation::CudaKernel { .. } => "cuda_kernel",
    }
}

fn describe(op: &IrOperator) -> String {
    let kind = op.operator_type.as_str();
    match &op.spec.implementation {
        IrOperatorImplementation::DenseMatrix { rows, cols, .. } => format!("{kind} operator, dense {rows}x{cols} matrix"),
        IrOperatorImplementation::SparseMatrix { rows, cols, values, .. } => {
            format!("{kind} operator, sparse {rows}x{cols} matrix ({} non-zero)", values.len())
        }
        IrOperatorImplementation::TensorNetwork { network } => {
            format!("{kind} operator, {} network over {} sites", network.network_type, network.tensors.len())
        }
        IrOperatorImplementation::CudaKernel { kernel_name } => format!("{kind} operator, cuda kernel {kernel_name}"),
    }
}

#[cfg(test)]
#[path = "codegen_test.rs"]
mod tests;
