//! Semantic analysis: inductive axiom expansion and constant folding.
//!
//! An axiom may be stated in terms of other axioms. Expansion inlines each
//! referenced axiom's expression, dependencies first, so every expanded axiom
//! is closed over operators, free symbols and constants only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Axiom, BinaryOp, Expression, Program, UnaryOp};
use crate::error::SemanticError;
use crate::graph::AxiomGraph;
use crate::typecheck::{TypeCheckedProgram, TypeInfo};

/// Node budget shared by every expanded axiom of a program. Repeated
/// references grow expansions exponentially.
pub const MAX_EXPANDED_NODES: usize = 262_144;
/// Depth budget for a single expanded axiom; later passes recurse over the tree.
pub const MAX_EXPANDED_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedProgram {
    pub program: Program,
    pub type_info: TypeInfo,
    /// Axioms with references inlined, in declaration order.
    pub expanded_axioms: Vec<Axiom>,
    /// Dependency order used for the expansion.
    pub axiom_order: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SemanticAnalyzer;

impl SemanticAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Expand inductive axioms.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::CyclicAxiom`] if axioms reference each other
    /// in a cycle (including an axiom referencing itself), and
    /// [`SemanticError::ExpansionTooLarge`] if an expansion would exceed
    /// [`MAX_EXPANDED_NODES`] or [`MAX_EXPANDED_DEPTH`].
    pub fn expand_axioms(&mut self, checked: &TypeCheckedProgram) -> Result<ExpandedProgram, SemanticError> {
        let program = &checked.program;
        let graph = AxiomGraph::from_program(program);
        let axiom_order = graph.topological_order()?;

        let by_name: HashMap<&str, &Axiom> = program.axioms.iter().map(|a| (a.name.as_str(), a)).rev().collect();
        let mut expanded: HashMap<&str, Expression> = HashMap::new();
        let mut sizes: HashMap<&str, ExpansionSize> = HashMap::new();
        let mut total_nodes = 0usize;
        for name in &axiom_order {
            let Some(axiom) = by_name.get(name.as_str()).copied() else {
                continue;
            };
            // Measured before building so oversized expansions never allocate.
            let size = measure(&axiom.expression, &sizes);
            total_nodes = total_nodes.saturating_add(size.nodes);
            if total_nodes > MAX_EXPANDED_NODES {
                return Err(too_large(name, "nodes", MAX_EXPANDED_NODES));
            }
            if size.depth > MAX_EXPANDED_DEPTH {
                return Err(too_large(name, "levels of nesting", MAX_EXPANDED_DEPTH));
            }
            let inlined = substitute(&axiom.expression, &expanded);
            expanded.insert(axiom.name.as_str(), inlined);
            sizes.insert(axiom.name.as_str(), size);
        }

        let expanded_axioms = program
            .axioms
            .iter()
            .map(|a| Axiom {
                name: a.name.clone(),
                expression: expanded.get(a.name.as_str()).cloned().unwrap_or_else(|| a.expression.clone()),
                metadata: a.metadata.clone(),
            })
            .collect();

        tracing::debug!(axioms = axiom_order.len(), edges = graph.edges.len(), "expanded axioms");

        Ok(ExpandedProgram {
            program: program.clone(),
            type_info: checked.type_info.clone(),
            expanded_axioms,
            axiom_order,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct ExpansionSize {
    nodes: usize,
    depth: usize,
}

fn too_large(axiom: &str, measure: &'static str, limit: usize) -> SemanticError {
    SemanticError::ExpansionTooLarge { axiom: axiom.to_owned(), measure, limit }
}

/// Size of `expr` once every bound axiom reference is inlined.
fn measure(expr: &Expression, sizes: &HashMap<&str, ExpansionSize>) -> ExpansionSize {
    let leaf = ExpansionSize { nodes: 1, depth: 1 };
    let join = |children: &[ExpansionSize]| ExpansionSize {
        nodes: children.iter().fold(1usize, |acc, c| acc.saturating_add(c.nodes)),
        depth: children.iter().map(|c| c.depth).max().unwrap_or(0).saturating_add(1),
    };
    match expr {
        Expression::Variable(name) => sizes.get(name.as_str()).copied().unwrap_or(leaf),
        Expression::Constant(_) => leaf,
        Expression::BinaryOp { left, right, .. } => join(&[measure(left, sizes), measure(right, sizes)]),
        Expression::UnaryOp { expr: inner, .. } => join(&[measure(inner, sizes)]),
        Expression::FunctionCall { args, .. } => {
            join(&args.iter().map(|a| measure(a, sizes)).collect::<Vec<_>>())
        }
    }
}

fn substitute(expr: &Expression, bindings: &HashMap<&str, Expression>) -> Expression {
    match expr {
        Expression::Variable(name) => bindings.get(name.as_str()).cloned().unwrap_or_else(|| expr.clone()),
        Expression::Constant(_) => expr.clone(),
        Expression::BinaryOp { op, left, right } => {
            Expression::binary(*op, substitute(left, bindings), substitute(right, bindings))
        }
        Expression::UnaryOp { op, expr: inner } => Expression::unary(*op, substitute(inner, bindings)),
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, bindings)).collect(),
        },
    }
}

/// Evaluate an expression that contains only constants.
///
/// Scalars are treated as 1x1 tensors, so transpose, conjugate, dagger and
/// trace are identities and `dot`/`⊗` reduce to multiplication. Returns
/// `None` for variables, unknown functions, cross products and non-finite
/// results.
#[must_use]
pub fn fold_constant(expr: &Expression) -> Option<f64> {
    let value = match expr {
        Expression::Variable(_) => return None,
        Expression::Constant(v) => *v,
        Expression::BinaryOp { op, left, right } => {
            let (l, r) = (fold_constant(left)?, fold_constant(right)?);
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul | BinaryOp::Dot | BinaryOp::Tensor => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Pow => l.powf(r),
                BinaryOp::Cross => return None,
            }
        }
        Expression::UnaryOp { op, expr } => {
            let v = fold_constant(expr)?;
            match op {
                UnaryOp::Neg => -v,
                UnaryOp::Transpose | UnaryOp::Conjugate | UnaryOp::Dagger | UnaryOp::Trace => v,
            }
        }
        Expression::FunctionCall { name, args } => {
            let values = args.iter().map(fold_constant).collect::<Option<Vec<f64>>>()?;
            apply_function(name, &values)?
        }
    };
    value.is_finite().then_some(value)
}

fn apply_function(name: &str, args: &[f64]) -> Option<f64> {
    match (name, args) {
        ("sqrt", [x]) => Some(x.sqrt()),
        ("exp", [x]) => Some(x.exp()),
        ("ln" | "log", [x]) => Some(x.ln()),
        ("abs", [x]) => Some(x.abs()),
        ("sin", [x]) => Some(x.sin()),
        ("cos", [x]) => Some(x.cos()),
        ("tan", [x]) => Some(x.tan()),
        ("min", [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, v| acc.min(*v))),
        ("max", [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, v| acc.max(*v))),
        _ => None,
    }
}

#[cfg(test)]
#[path = "semantic_test.rs"]
mod tests;
