//! Intermediate representation and AST lowering.
//!
//! The IR is what the solver runtime consumes: operators carry a concrete
//! numeric implementation and a target, axioms and constraints become
//! zero-argument functions, and `main` is the evolution entry point.

use serde::{Deserialize, Serialize};

use crate::ast::{
    BinaryOp, Expression, InitialState, Operator, OperatorType, Program, TensorNetworkSpec, TruncationMethod, UnaryOp,
};
use crate::error::LowerError;
use crate::semantic::ExpandedProgram;

pub const ENTRY_POINT: &str = "main";
const DEFAULT_PHYSICAL_DIM: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrProgram {
    pub modules: Vec<IrModule>,
    pub entry_point: String,
}

impl IrProgram {
    /// Every operator across modules.
    pub fn operators(&self) -> impl Iterator<Item = &IrOperator> {
        self.modules.iter().flat_map(|m| m.operators.iter())
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.modules.iter().flat_map(|m| m.functions.iter()).find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrModule {
    pub name: String,
    pub functions: Vec<IrFunction>,
    pub operators: Vec<IrOperator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunction {
    pub name: String,
    pub parameters: Vec<IrParameter>,
    pub body: IrBlock,
    pub return_type: IrType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrParameter {
    pub name: String,
    pub param_type: IrType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrBlock {
    pub statements: Vec<IrStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrStatement {
    Assign { var: String, value: IrExpression },
    Call { function: String, args: Vec<IrExpression> },
    Return { value: Option<IrExpression> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrExpression {
    Variable(String),
    Constant(IrConstant),
    BinaryOp { op: IrBinaryOp, left: Box<IrExpression>, right: Box<IrExpression> },
    UnaryOp { op: IrUnaryOp, expr: Box<IrExpression> },
    Call { function: String, args: Vec<IrExpression> },
    TensorOp { op: TensorOperation, operands: Vec<IrExpression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrConstant {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Dot,
    Cross,
    TensorProduct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrUnaryOp {
    Neg,
    Transpose,
    Conjugate,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorOperation {
    SvdTruncate,
    QrDecompose,
    Renormalize,
}

impl From<TruncationMethod> for TensorOperation {
    fn from(method: TruncationMethod) -> Self {
        match method {
            TruncationMethod::Svd => Self::SvdTruncate,
            TruncationMethod::Qr => Self::QrDecompose,
            TruncationMethod::Rg => Self::Renormalize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrOperator {
    pub name: String,
    pub operator_type: OperatorType,
    pub spec: IrOperatorSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrOperatorSpec {
    pub target: IrTarget,
    pub implementation: IrOperatorImplementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrTarget {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IrOperatorImplementation {
    DenseMatrix { rows: usize, cols: usize, data: Vec<f64> },
    SparseMatrix { rows: usize, cols: usize, indices: Vec<(usize, usize)>, values: Vec<f64> },
    TensorNetwork { network: IrTensorNetwork },
    CudaKernel { kernel_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrTensorNetwork {
    pub network_type: String,
    pub tensors: Vec<IrTensor>,
    pub bonds: Vec<IrBond>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrTensor {
    pub name: String,
    /// `[left bond, physical, right bond]`
    pub shape: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrBond {
    pub tensor1: String,
    pub index1: usize,
    pub tensor2: String,
    pub index2: usize,
    pub dimension: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrType {
    Unit,
    Float,
    State,
}

// =============================================================================
// LOWERING
// =============================================================================

/// Lower an expanded program into a single `main` module.
///
/// # Errors
///
/// Returns [`LowerError`] if an operator has nothing to lower or the initial
/// state names an operator that does not exist.
pub fn lower(expanded: &ExpandedProgram) -> Result<IrProgram, LowerError> {
    let program = &expanded.program;
    let physical_dims = program.initial_state.as_ref().map(|s| s.psi_0.dimensions.as_slice());

    let operators = program
        .operators
        .iter()
        .map(|op| lower_operator(op, physical_dims))
        .collect::<Result<Vec<_>, _>>()?;

    let mut functions = Vec::new();
    for axiom in &expanded.expanded_axioms {
        let value = lower_expression(&axiom.expression);
        functions.push(IrFunction {
            name: axiom_function(&axiom.name),
            parameters: Vec::new(),
            body: IrBlock {
                statements: vec![
                    IrStatement::Assign { var: axiom.name.clone(), value },
                    IrStatement::Return { value: Some(IrExpression::Variable(axiom.name.clone())) },
                ],
            },
            return_type: IrType::Float,
        });
    }
    for constraint in &program.constraints {
        functions.push(IrFunction {
            name: constraint_function(&constraint.name),
            parameters: Vec::new(),
            body: IrBlock {
                statements: vec![IrStatement::Return { value: Some(lower_expression(&constraint.expression)) }],
            },
            return_type: IrType::Float,
        });
    }
    functions.push(entry_function(program)?);

    tracing::debug!(operators = operators.len(), functions = functions.len(), "lowered program");

    Ok(IrProgram {
        modules: vec![IrModule { name: ENTRY_POINT.to_owned(), functions, operators }],
        entry_point: ENTRY_POINT.to_owned(),
    })
}

#[must_use]
pub fn axiom_function(name: &str) -> String {
    format!("axiom_{name}")
}

#[must_use]
pub fn constraint_function(name: &str) -> String {
    format!("constraint_{name}")
}

fn entry_function(program: &Program) -> Result<IrFunction, LowerError> {
    let mut statements: Vec<IrStatement> = program
        .axioms
        .iter()
        .map(|a| axiom_function(&a.name))
        .chain(program.constraints.iter().map(|c| constraint_function(&c.name)))
        .map(|function| IrStatement::Call { function, args: Vec::new() })
        .collect();

    let Some(state) = &program.initial_state else {
        statements.push(IrStatement::Return { value: None });
        return Ok(IrFunction {
            name: ENTRY_POINT.to_owned(),
            parameters: Vec::new(),
            body: IrBlock { statements },
            return_type: IrType::Unit,
        });
    };

    statements.extend(evolution_statements(state, program)?);
    statements.push(IrStatement::Return { value: Some(IrExpression::Variable(state.name.clone())) });

    Ok(IrFunction {
        name: ENTRY_POINT.to_owned(),
        parameters: vec![IrParameter { name: state.name.clone(), param_type: IrType::State }],
        body: IrBlock { statements },
        return_type: IrType::State,
    })
}

/// `psi = evolve(psi, H)` followed by the hamiltonian's truncation, if any.
fn evolution_statements(state: &InitialState, program: &Program) -> Result<Vec<IrStatement>, LowerError> {
    let psi = IrExpression::Variable(state.name.clone());
    let mut args = vec![psi.clone()];
    let mut truncation = None;

    if let Some(h_name) = &state.hamiltonian {
        let h = program.operator(h_name).ok_or_else(|| LowerError::UnresolvedOperator(h_name.clone()))?;
        args.push(IrExpression::Variable(h.name.clone()));
        truncation = h.spec.tensor_network.as_ref().and_then(|n| n.truncation);
    }

    let mut out = vec![IrStatement::Assign {
        var: state.name.clone(),
        value: IrExpression::Call { function: "evolve".to_owned(), args },
    }];

    if let Some(trunc) = truncation {
        out.push(IrStatement::Assign {
            var: state.name.clone(),
            value: IrExpression::TensorOp {
                op: trunc.method.into(),
                operands: vec![
                    psi,
                    IrExpression::Constant(IrConstant::Int(i64::try_from(trunc.max_bond_dim).unwrap_or(i64::MAX))),
                    IrExpression::Constant(IrConstant::Float(trunc.tolerance)),
                ],
            },
        });
    }

    Ok(out)
}

fn lower_operator(op: &Operator, physical_dims: Option<&[usize]>) -> Result<IrOperator, LowerError> {
    let target = if op.spec.gpu_kernel.is_some() { IrTarget::Gpu } else { IrTarget::Cpu };

    // A concrete numeric form wins over an opaque kernel name.
    let implementation = if let Some(m) = &op.spec.matrix_representation {
        if m.sparse {
            let (indices, values) = m
                .data
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0.0)
                .map(|(i, &v)| ((i / m.cols, i % m.cols), v))
                .unzip();
            IrOperatorImplementation::SparseMatrix { rows: m.rows, cols: m.cols, indices, values }
        } else {
            IrOperatorImplementation::DenseMatrix { rows: m.rows, cols: m.cols, data: m.data.clone() }
        }
    } else if let Some(net) = &op.spec.tensor_network {
        IrOperatorImplementation::TensorNetwork { network: lower_network(&op.name, net, physical_dims) }
    } else if let Some(kernel) = &op.spec.gpu_kernel {
        IrOperatorImplementation::CudaKernel { kernel_name: kernel.clone() }
    } else {
        return Err(LowerError::EmptyOperator { operator: op.name.clone() });
    };

    Ok(IrOperator { name: op.name.clone(), operator_type: op.operator_type, spec: IrOperatorSpec { target, implementation } })
}

/// Lay the declared bonds out as a chain of site tensors.
///
/// `n` bond dimensions give `n + 1` sites. Physical dimensions come from the
/// initial state when its site count matches, otherwise qubits are assumed.
fn lower_network(name: &str, net: &TensorNetworkSpec, physical_dims: Option<&[usize]>) -> IrTensorNetwork {
    let sites = net.bond_dimensions.len() + 1;
    let physical = |i: usize| {
        physical_dims
            .filter(|dims| dims.len() == sites)
            .map_or(DEFAULT_PHYSICAL_DIM, |dims| dims[i])
    };

    let tensors: Vec<IrTensor> = (0..sites)
        .map(|i| {
            let left = if i == 0 { 1 } else { net.bond_dimensions[i - 1] };
            let right = net.bond_dimensions.get(i).copied().unwrap_or(1);
            IrTensor { name: format!("{name}_{i}"), shape: vec![left, physical(i), right] }
        })
        .collect();

    let bonds = net
        .bond_dimensions
        .iter()
        .enumerate()
        .map(|(i, &dimension)| IrBond {
            tensor1: tensors[i].name.clone(),
            index1: 2,
            tensor2: tensors[i + 1].name.clone(),
            index2: 0,
            dimension,
        })
        .collect();

    IrTensorNetwork { network_type: net.network_type.as_str().to_owned(), tensors, bonds }
}

#[must_use]
pub fn lower_expression(expr: &Expression) -> IrExpression {
    match expr {
        Expression::Variable(name) => IrExpression::Variable(name.clone()),
        Expression::Constant(v) => IrExpression::Constant(IrConstant::Float(*v)),
        Expression::BinaryOp { op, left, right } => {
            let op = match op {
                BinaryOp::Add => IrBinaryOp::Add,
                BinaryOp::Sub => IrBinaryOp::Sub,
                BinaryOp::Mul => IrBinaryOp::Mul,
                BinaryOp::Div => IrBinaryOp::Div,
                BinaryOp::Pow => IrBinaryOp::Pow,
                BinaryOp::Dot => IrBinaryOp::Dot,
                BinaryOp::Cross => IrBinaryOp::Cross,
                BinaryOp::Tensor => IrBinaryOp::TensorProduct,
            };
            IrExpression::BinaryOp { op, left: Box::new(lower_expression(left)), right: Box::new(lower_expression(right)) }
        }
        Expression::UnaryOp { op, expr } => {
            let inner = lower_expression(expr);
            let unary = |op, expr| IrExpression::UnaryOp { op, expr: Box::new(expr) };
            match op {
                UnaryOp::Neg => unary(IrUnaryOp::Neg, inner),
                UnaryOp::Transpose => unary(IrUnaryOp::Transpose, inner),
                UnaryOp::Conjugate => unary(IrUnaryOp::Conjugate, inner),
                UnaryOp::Trace => unary(IrUnaryOp::Trace, inner),
                UnaryOp::Dagger => unary(IrUnaryOp::Conjugate, unary(IrUnaryOp::Transpose, inner)),
            }
        }
        Expression::FunctionCall { name, args } => {
            IrExpression::Call { function: name.clone(), args: args.iter().map(lower_expression).collect() }
        }
    }
}

#[cfg(test)]
#[path = "ir_test.rs"]
mod tests;
