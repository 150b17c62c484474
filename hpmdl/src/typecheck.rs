//! Structural checks on a parsed program.
//!
//! The typechecker validates shapes (matrix sizes, tensor network bonds,
//! state dimensions), name uniqueness and the state → hamiltonian
//! reference, and records a symbol table for later stages.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ast::{InitialState, Operator, OperatorType, Program};
use crate::error::TypeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Axiom,
    Operator,
    State,
    Constraint,
}

impl SymbolKind {
    fn label(self) -> &'static str {
        match self {
            Self::Axiom => "axiom",
            Self::Operator => "operator",
            Self::State => "state",
            Self::Constraint => "constraint",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Every declared name.
    pub symbols: BTreeMap<String, SymbolKind>,
    /// Identifiers used in expressions that are not declared anywhere.
    pub free_variables: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCheckedProgram {
    pub program: Program,
    pub type_info: TypeInfo,
}

#[derive(Debug, Default)]
pub struct TypeChecker;

impl TypeChecker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate `program` and build its symbol table.
    ///
    /// # Errors
    ///
    /// Returns the first [`TypeError`] found, checking names, then operators,
    /// then the initial state.
    pub fn typecheck(&mut self, program: &Program) -> Result<TypeCheckedProgram, TypeError> {
        let symbols = collect_symbols(program)?;

        for op in &program.operators {
            check_operator(op)?;
        }

        if let Some(state) = &program.initial_state {
            check_state(state, program)?;
        }

        let free_variables = program
            .axioms
            .iter()
            .map(|a| &a.expression)
            .chain(program.constraints.iter().map(|c| &c.expression))
            .flat_map(crate::ast::Expression::variables)
            .filter(|name| !symbols.contains_key(name))
            .collect();

        let type_info = TypeInfo { symbols, free_variables };
        tracing::debug!(
            symbols = type_info.symbols.len(),
            free_variables = type_info.free_variables.len(),
            "typecheck passed"
        );

        Ok(TypeCheckedProgram { program: program.clone(), type_info })
    }
}

fn collect_symbols(program: &Program) -> Result<BTreeMap<String, SymbolKind>, TypeError> {
    let declared = program
        .axioms
        .iter()
        .map(|a| (&a.name, SymbolKind::Axiom))
        .chain(program.operators.iter().map(|o| (&o.name, SymbolKind::Operator)))
        .chain(program.initial_state.iter().map(|s| (&s.name, SymbolKind::State)))
        .chain(program.constraints.iter().map(|c| (&c.name, SymbolKind::Constraint)));

    let mut symbols = BTreeMap::new();
    for (name, kind) in declared {
        if let Some(first) = symbols.insert(name.clone(), kind) {
            return Err(TypeError::DuplicateName { name: name.clone(), first: first.label(), second: kind.label() });
        }
    }
    Ok(symbols)
}

fn check_operator(op: &Operator) -> Result<(), TypeError> {
    if op.spec.is_empty() {
        return Err(TypeError::MissingImplementation { operator: op.name.clone() });
    }

    if let Some(m) = &op.spec.matrix_representation {
        if m.rows == 0 || m.cols == 0 {
            return Err(TypeError::EmptyMatrix { operator: op.name.clone() });
        }
        if let Some((row, &len)) = m.row_lengths.iter().enumerate().find(|&(_, &len)| len != m.cols) {
            return Err(TypeError::RaggedRow { operator: op.name.clone(), row, len, cols: m.cols });
        }
        if m.rows * m.cols != m.data.len() {
            return Err(TypeError::MatrixSize { operator: op.name.clone(), rows: m.rows, cols: m.cols, len: m.data.len() });
        }
        if op.operator_type == OperatorType::Hamiltonian && m.rows != m.cols {
            return Err(TypeError::NonSquareHamiltonian { operator: op.name.clone(), rows: m.rows, cols: m.cols });
        }
    }

    if let Some(net) = &op.spec.tensor_network {
        let invalid = |message: &str| TypeError::InvalidTensorNetwork { operator: op.name.clone(), message: message.to_owned() };
        if net.bond_dimensions.contains(&0) {
            return Err(invalid("bond dimensions must be non-zero"));
        }
        if let Some(trunc) = &net.truncation {
            if trunc.max_bond_dim == 0 {
                return Err(invalid("truncation max bond dimension must be non-zero"));
            }
            if !(trunc.tolerance > 0.0 && trunc.tolerance < 1.0) {
                return Err(invalid("truncation tolerance must lie in (0, 1)"));
            }
        }
    }

    Ok(())
}

fn check_state(state: &InitialState, program: &Program) -> Result<(), TypeError> {
    let dims = &state.psi_0.dimensions;
    if dims.is_empty() {
        return Err(TypeError::MissingDimensions);
    }
    if let Some(index) = dims.iter().position(|&d| d == 0) {
        return Err(TypeError::ZeroDimension { state: state.name.clone(), index });
    }

    if let Some(h_name) = &state.hamiltonian {
        let Some(op) = program.operator(h_name) else {
            return Err(TypeError::UnknownHamiltonian { state: state.name.clone(), name: h_name.clone() });
        };
        if op.operator_type != OperatorType::Hamiltonian {
            return Err(TypeError::NotAHamiltonian {
                state: state.name.clone(),
                name: h_name.clone(),
                kind: op.operator_type.as_str(),
            });
        }
        if let Some(m) = &op.spec.matrix_representation {
            let state_dim = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)).unwrap_or(usize::MAX);
            if state_dim != m.rows {
                return Err(TypeError::DimensionMismatch {
                    state: state.name.clone(),
                    name: h_name.clone(),
                    state_dim,
                    matrix_dim: m.rows,
                });
            }
        }
    }

    for topo in &state.topology_constraints {
        if let (Some(betti), Some(generators)) = (&topo.betti_numbers, &topo.homology_generators) {
            if let Some(g) = generators.iter().find(|g| g.dimension >= betti.len()) {
                return Err(TypeError::GeneratorDimension {
                    state: state.name.clone(),
                    dimension: g.dimension,
                    betti_len: betti.len(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "typecheck_test.rs"]
mod tests;
