//! End-to-end compile pipeline.
//!
//! `parse -> typecheck -> expand -> safety -> lower -> codegen`. Safety
//! findings never abort compilation; they travel with the artifacts so the
//! runtime (or a human) can decide whether to run the job.

use serde::{Deserialize, Serialize};

use crate::ast::Program;
use crate::codegen::{CodeGenerator, JobDescriptor, NumericOperatorSpecs, OperatorCatalog};
use crate::error::CompileError;
use crate::graph::AxiomGraph;
use crate::ir::{self, IrProgram};
use crate::parse::parse;
use crate::safety::{SafetyChecker, SafetyReport};
use crate::semantic::{ExpandedProgram, SemanticAnalyzer};
use crate::typecheck::{TypeChecker, TypeInfo};

pub const DEFAULT_TIME_STEP: f64 = 0.01;
pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Evolution parameters stamped into generated job descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub time_step: f64,
    pub max_steps: usize,
    pub tolerance: f64,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { time_step: DEFAULT_TIME_STEP, max_steps: DEFAULT_MAX_STEPS, tolerance: DEFAULT_TOLERANCE }
    }
}

impl CompilerOptions {
    /// Read options from the environment.
    ///
    /// Optional:
    /// - `HPMDL_TIME_STEP`: default 0.01
    /// - `HPMDL_MAX_STEPS`: default 1000
    /// - `HPMDL_TOLERANCE`: default 1e-8
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through `lookup`, which maps a variable name to its raw value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            time_step: lookup_parse(&lookup, "HPMDL_TIME_STEP", DEFAULT_TIME_STEP),
            max_steps: lookup_parse(&lookup, "HPMDL_MAX_STEPS", DEFAULT_MAX_STEPS),
            tolerance: lookup_parse(&lookup, "HPMDL_TOLERANCE", DEFAULT_TOLERANCE),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset or invalid.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup_parse(&|k: &str| std::env::var(k).ok(), key, default)
}

/// Parse `key` through `lookup`, falling back to `default` when absent or invalid.
pub fn lookup_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key).and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

/// Result of checking a program without generating code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub type_info: TypeInfo,
    pub axiom_order: Vec<String>,
    pub safety: SafetyReport,
}

/// Everything produced by a successful compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArtifacts {
    pub program: Program,
    pub expanded: ExpandedProgram,
    pub axiom_graph: AxiomGraph,
    pub ir: IrProgram,
    pub catalog: OperatorCatalog,
    pub numeric_specs: NumericOperatorSpecs,
    pub job: JobDescriptor,
    pub safety: SafetyReport,
}

fn analyze(source: &str) -> Result<(ExpandedProgram, SafetyReport), CompileError> {
    let program = parse(source)?;
    let checked = TypeChecker::new().typecheck(&program)?;
    let expanded = SemanticAnalyzer::new().expand_axioms(&checked)?;
    let safety = SafetyChecker::new().check_all(&expanded.program);
    Ok((expanded, safety))
}

/// Parse, typecheck, expand and safety-check `source`.
///
/// # Errors
///
/// Returns the first parse, type or semantic error.
pub fn check(source: &str) -> Result<CheckReport, CompileError> {
    let (expanded, safety) = analyze(source)?;
    Ok(CheckReport { type_info: expanded.type_info, axiom_order: expanded.axiom_order, safety })
}

/// Compile `source` into IR, operator specs and a job descriptor.
///
/// # Errors
///
/// Returns the first parse, type, semantic or lowering error.
pub fn compile(source: &str, options: &CompilerOptions) -> Result<CompiledArtifacts, CompileError> {
    let (expanded, safety) = analyze(source)?;
    let ir = ir::lower(&expanded)?;

    let codegen = CodeGenerator::new();
    let program = expanded.program.clone();
    let catalog = codegen.generate_operator_catalog(&ir, &program);
    let numeric_specs = codegen.generate_numeric_specs(&ir);
    let job = codegen.generate_job_descriptor(&ir, &program, options);
    let axiom_graph = AxiomGraph::from_program(&program);

    tracing::info!(
        axioms = program.axioms.len(),
        operators = program.operators.len(),
        constraints = program.constraints.len(),
        safe = safety.is_safe(),
        "compiled program"
    );

    Ok(CompiledArtifacts { program, expanded, axiom_graph, ir, catalog, numeric_specs, job, safety })
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
