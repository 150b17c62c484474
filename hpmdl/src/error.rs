//! Error types for every compiler stage.
//!
//! DESIGN
//! ======
//! Each stage owns a `thiserror` enum. `CompileError` wraps them so the
//! pipeline can use `?` throughout, and `ErrorCode` gives callers (the HTTP
//! server, the CLI) a stable grep-able code without matching on variants.

use std::fmt;

/// Grepable error code for structured error responses.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{pos}: unexpected character {ch:?}")]
    UnexpectedChar { pos: Position, ch: char },
    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: Position },
    #[error("{pos}: malformed number {text:?}")]
    MalformedNumber { pos: Position, text: String },
    #[error("{pos}: expected {expected}, found {found}")]
    Expected { pos: Position, expected: String, found: String },
    #[error("{pos}: {message}")]
    Invalid { pos: Position, message: String },
}

impl ParseError {
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::UnexpectedChar { pos, .. }
            | Self::UnterminatedString { pos }
            | Self::MalformedNumber { pos, .. }
            | Self::Expected { pos, .. }
            | Self::Invalid { pos, .. } => *pos,
        }
    }
}

impl ErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        "E_PARSE"
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("duplicate name `{name}` ({first} and {second})")]
    DuplicateName { name: String, first: &'static str, second: &'static str },
    #[error("operator {operator}: matrix size {rows}x{cols} but data len {len}")]
    MatrixSize { operator: String, rows: usize, cols: usize, len: usize },
    #[error("operator {operator}: matrix row {row} has {len} entries, expected {cols}")]
    RaggedRow { operator: String, row: usize, len: usize, cols: usize },
    #[error("operator {operator}: matrix dimensions must be non-zero")]
    EmptyMatrix { operator: String },
    #[error("operator {operator}: hamiltonian matrix must be square, got {rows}x{cols}")]
    NonSquareHamiltonian { operator: String, rows: usize, cols: usize },
    #[error("operator {operator}: no implementation declared")]
    MissingImplementation { operator: String },
    #[error("operator {operator}: {message}")]
    InvalidTensorNetwork { operator: String, message: String },
    #[error("initial state dimensions missing")]
    MissingDimensions,
    #[error("initial state {state}: dimension {index} is zero")]
    ZeroDimension { state: String, index: usize },
    #[error("initial state {state}: unknown hamiltonian `{name}`")]
    UnknownHamiltonian { state: String, name: String },
    #[error("initial state {state}: `{name}` is a {kind} operator, not a hamiltonian")]
    NotAHamiltonian { state: String, name: String, kind: &'static str },
    #[error("initial state {state}: hilbert space dimension {state_dim} does not match hamiltonian `{name}` ({matrix_dim})")]
    DimensionMismatch { state: String, name: String, state_dim: usize, matrix_dim: usize },
    #[error("initial state {state}: homology generator of dimension {dimension} exceeds {betti_len} betti numbers")]
    GeneratorDimension { state: String, dimension: usize, betti_len: usize },
}

impl ErrorCode for TypeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } => "E_DUPLICATE_NAME",
            Self::MatrixSize { .. } | Self::RaggedRow { .. } | Self::EmptyMatrix { .. } => "E_MATRIX_SHAPE",
            Self::NonSquareHamiltonian { .. } | Self::DimensionMismatch { .. } => "E_DIMENSION",
            Self::MissingImplementation { .. } => "E_MISSING_IMPLEMENTATION",
            Self::InvalidTensorNetwork { .. } => "E_TENSOR_NETWORK",
            Self::MissingDimensions | Self::ZeroDimension { .. } | Self::GeneratorDimension { .. } => "E_STATE",
            Self::UnknownHamiltonian { .. } | Self::NotAHamiltonian { .. } => "E_HAMILTONIAN_REF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("cyclic axiom definition: {}", chain.join(" -> "))]
    CyclicAxiom { chain: Vec<String> },
    #[error("axiom {axiom}: expansion exceeds {limit} {measure}")]
    ExpansionTooLarge { axiom: String, measure: &'static str, limit: usize },
}

impl ErrorCode for SemanticError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CyclicAxiom { .. } => "E_CYCLIC_AXIOM",
            Self::ExpansionTooLarge { .. } => "E_EXPANSION_TOO_LARGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LowerError {
    #[error("operator {operator}: nothing to lower")]
    EmptyOperator { operator: String },
    #[error("initial state references undeclared operator `{0}`")]
    UnresolvedOperator(String),
}

impl ErrorCode for LowerError {
    fn error_code(&self) -> &'static str {
        "E_LOWER"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cbor encoding error: {0}")]
    Cbor(String),
}

impl ErrorCode for PackageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E_IO",
            Self::Serialize(_) | Self::Cbor(_) => "E_SERIALIZE",
        }
    }
}

/// Umbrella error for the full compile pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("lowering error: {0}")]
    Lower(#[from] LowerError),
    #[error("packaging error: {0}")]
    Package(#[from] PackageError),
}

impl ErrorCode for CompileError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.error_code(),
            Self::Type(e) => e.error_code(),
            Self::Semantic(e) => e.error_code(),
            Self::Lower(e) => e.error_code(),
            Self::Package(e) => e.error_code(),
        }
    }
}
