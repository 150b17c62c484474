//! HPM-DL compiler.
//!
//! ARCHITECTURE
//! ============
//! ```text
//! source ─► lexer ─► parse ─► typecheck ─► semantic ─► safety
//!                                              │
//!                                              ▼
//!                         packager ◄─ codegen ◄─ ir
//! ```
//!
//! `pipeline` drives the stages; the server and CLI only call
//! [`check`], [`compile`] and [`ArtifactPackager`].

pub mod ast;
pub mod codegen;
pub mod error;
pub mod graph;
pub mod ir;
pub mod lexer;
pub mod packager;
pub mod parse;
pub mod pipeline;
pub mod safety;
pub mod semantic;
pub mod typecheck;

pub use error::{CompileError, ErrorCode};
pub use graph::AxiomGraph;
pub use packager::{ArtifactManifest, ArtifactPackager};
pub use parse::{parse, parse_expression};
pub use pipeline::{CheckReport, CompiledArtifacts, CompilerOptions, check, compile};
pub use semantic::fold_constant;
