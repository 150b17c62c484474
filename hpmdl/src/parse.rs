//! Recursive descent parser for HPM-DL.
//!
//! Statements are `axiom`, `operator`, `state` and `constraint`. Expressions
//! use the usual precedence ladder (additive < multiplicative < unary < `^`)
//! with word spellings for the tensor operators (`dot`, `otimes`, `x`, ...).
//! Word operators are whole identifiers only: `Theta` is a variable, never
//! `T` applied to `heta`.

use crate::ast::{
    Axiom, AxiomMetadata, BinaryOp, Constraint, ConstraintType, Expression, HomologyGenerator, InitialState,
    MatrixSpec, Operator, OperatorSpec, OperatorType, Program, SafetyLevel, StateRepresentation, StateSpec,
    TensorNetworkSpec, TensorNetworkType, TopologyConstraint, TruncationMethod, TruncationSpec, UnaryOp,
};
use crate::error::{ParseError, Position};
use crate::lexer::{Token, TokenKind, tokenize};

/// Identifiers that begin a statement or clause and so never start an operand.
const RESERVED: &[&str] =
    &["axiom", "operator", "state", "constraint", "tags", "safety", "description", "hamiltonian", "topology"];

/// Deepest expression accepted, counting both tree depth and parenthesis nesting.
pub const MAX_NESTING: usize = 128;

/// Parse HPM-DL source text into a [`Program`].
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the `line:col` of the first offending token.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, idx: 0, nesting: 0 };
    parser.program()
}

/// Parse a standalone expression (used by the editor API for quick evaluation).
///
/// # Errors
///
/// Returns a [`ParseError`] if the input is not exactly one expression.
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, idx: 0, nesting: 0 };
    let expr = parser.expr()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    /// Open recursive expression frames.
    nesting: usize,
}

impl Parser {
    // -------------------------------------------------------------------------
    // token cursor
    // -------------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof.
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let i = (self.idx + offset).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn pos(&self) -> Position {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.idx += 1;
        }
        tok
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::Expected { pos: self.pos(), expected: expected.to_owned(), found: self.peek().kind.describe() }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) { Ok(()) } else { Err(self.error(&kind.describe())) }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.peek().kind == TokenKind::Eof { Ok(()) } else { Err(self.error("end of input")) }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.eat_word(word) { Ok(()) } else { Err(self.error(&format!("`{word}`"))) }
    }

    fn ident(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    /// Consume one of a fixed set of keyword spellings, returning its index.
    fn choice(&mut self, options: &[&str], what: &str) -> Result<usize, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            if let Some(i) = options.iter().position(|o| o == name) {
                self.advance();
                return Ok(i);
            }
        }
        Err(self.error(&format!("{what} ({})", options.join(" | "))))
    }

    fn int(&mut self) -> Result<usize, ParseError> {
        let pos = self.pos();
        match &self.peek().kind {
            TokenKind::Number { text, .. } if text.bytes().all(|b| b.is_ascii_digit()) => {
                let value =
                    text.parse::<usize>().map_err(|_| ParseError::MalformedNumber { pos, text: text.clone() })?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.error("integer")),
        }
    }

    /// A numeric literal with an optional leading minus sign.
    fn signed_number(&mut self) -> Result<f64, ParseError> {
        let negative = self.eat(&TokenKind::Minus);
        match self.peek().kind {
            TokenKind::Number { value, .. } => {
                self.advance();
                Ok(if negative { -value } else { value })
            }
            _ => Err(self.error("number")),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("string literal")),
        }
    }

    /// `[ int (, int)* ]`
    fn int_list(&mut self) -> Result<Vec<usize>, ParseError> {
        self.expect(&TokenKind::LBracket)?;
        let mut out = vec![self.int()?];
        while self.eat(&TokenKind::Comma) {
            out.push(self.int()?);
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // statements
    // -------------------------------------------------------------------------

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        loop {
            let pos = self.pos();
            match &self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Ident(kw) if kw == "axiom" => {
                    self.advance();
                    program.axioms.push(self.axiom()?);
                }
                TokenKind::Ident(kw) if kw == "operator" => {
                    self.advance();
                    program.operators.push(self.operator()?);
                }
                TokenKind::Ident(kw) if kw == "state" => {
                    self.advance();
                    let state = self.state()?;
                    if let Some(existing) = &program.initial_state {
                        return Err(ParseError::Invalid {
                            pos,
                            message: format!("initial state already declared as `{}`", existing.name),
                        });
                    }
                    program.initial_state = Some(state);
                }
                TokenKind::Ident(kw) if kw == "constraint" => {
                    self.advance();
                    program.constraints.push(self.constraint()?);
                }
                _ => return Err(self.error("`axiom`, `operator`, `state` or `constraint`")),
            }
        }

        Ok(program)
    }

    fn axiom(&mut self) -> Result<Axiom, ParseError> {
        let name = self.ident("axiom name")?;
        self.expect(&TokenKind::Colon)?;
        let expression = self.expr()?;

        let mut metadata = AxiomMetadata::default();
        if self.eat_word("tags") {
            self.expect(&TokenKind::LBracket)?;
            metadata.tags.push(self.ident("tag")?);
            while self.eat(&TokenKind::Comma) {
                metadata.tags.push(self.ident("tag")?);
            }
            self.expect(&TokenKind::RBracket)?;
        }
        if self.eat_word("safety") {
            const LEVELS: [SafetyLevel; 3] = [SafetyLevel::Safe, SafetyLevel::RequiresHumanForce, SafetyLevel::Dangerous];
            let i = self.choice(&["safe", "requires_human_force", "dangerous"], "safety level")?;
            metadata.safety_level = LEVELS[i];
        }
        if self.eat_word("description") {
            metadata.description = Some(self.string()?);
        }

        Ok(Axiom { name, expression, metadata })
    }

    fn operator(&mut self) -> Result<Operator, ParseError> {
        const KINDS: [OperatorType; 4] = [
            OperatorType::Hamiltonian,
            OperatorType::Dissipative,
            OperatorType::TopologicalMutation,
            OperatorType::EntropyFlow,
        ];

        let name = self.ident("operator name")?;
        self.expect(&TokenKind::Colon)?;
        let i = self.choice(&["hamiltonian", "dissipative", "topological_mutation", "entropy_flow"], "operator kind")?;

        let mut spec = OperatorSpec::default();
        if self.eat(&TokenKind::LBrace) {
            while !self.eat(&TokenKind::RBrace) {
                self.operator_item(&name, &mut spec)?;
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::RBrace)?;
                    break;
                }
            }
        }

        Ok(Operator { name, operator_type: KINDS[i], spec })
    }

    fn operator_item(&mut self, operator: &str, spec: &mut OperatorSpec) -> Result<(), ParseError> {
        let pos = self.pos();
        let duplicate = |item: &str| ParseError::Invalid {
            pos,
            message: format!("operator {operator}: duplicate {item} declaration"),
        };

        if self.eat_word("matrix") {
            if spec.matrix_representation.is_some() {
                return Err(duplicate("matrix"));
            }
            spec.matrix_representation = Some(self.matrix()?);
        } else if self.eat_word("tensor_net") {
            if spec.tensor_network.is_some() {
                return Err(duplicate("tensor_net"));
            }
            spec.tensor_network = Some(self.tensor_net()?);
        } else if self.eat_word("cuda_kernel") {
            if spec.gpu_kernel.is_some() {
                return Err(duplicate("cuda_kernel"));
            }
            self.expect(&TokenKind::LParen)?;
            spec.gpu_kernel = Some(self.string()?);
            self.expect(&TokenKind::RParen)?;
        } else {
            return Err(self.error("`matrix`, `tensor_net` or `cuda_kernel`"));
        }
        Ok(())
    }

    /// `matrix(rows, cols, dense|sparse) = [[..], ..]`
    fn matrix(&mut self) -> Result<MatrixSpec, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let rows = self.int()?;
        self.expect(&TokenKind::Comma)?;
        let cols = self.int()?;
        self.expect(&TokenKind::Comma)?;
        let sparse = self.choice(&["dense", "sparse"], "storage")? == 1;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Eq)?;

        let mut data = Vec::new();
        let mut row_lengths = Vec::new();
        self.expect(&TokenKind::LBracket)?;
        loop {
            self.expect(&TokenKind::LBracket)?;
            let start = data.len();
            data.push(self.signed_number()?);
            while self.eat(&TokenKind::Comma) {
                data.push(self.signed_number()?);
            }
            self.expect(&TokenKind::RBracket)?;
            row_lengths.push(data.len() - start);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;

        Ok(MatrixSpec { rows, cols, sparse, data, row_lengths })
    }

    /// `tensor_net(mps|peps|mera, [dims] [, trunc(method, max, tol)])`
    fn tensor_net(&mut self) -> Result<TensorNetworkSpec, ParseError> {
        const KINDS: [TensorNetworkType; 3] = [TensorNetworkType::Mps, TensorNetworkType::Peps, TensorNetworkType::Mera];
        const METHODS: [TruncationMethod; 3] = [TruncationMethod::Svd, TruncationMethod::Qr, TruncationMethod::Rg];

        self.expect(&TokenKind::LParen)?;
        let kind = self.choice(&["mps", "peps", "mera"], "network type")?;
        self.expect(&TokenKind::Comma)?;
        let bond_dimensions = self.int_list()?;

        let mut truncation = None;
        if self.eat(&TokenKind::Comma) {
            self.expect_word("trunc")?;
            self.expect(&TokenKind::LParen)?;
            let method = self.choice(&["svd", "qr", "rg"], "truncation method")?;
            self.expect(&TokenKind::Comma)?;
            let max_bond_dim = self.int()?;
            self.expect(&TokenKind::Comma)?;
            let tolerance = self.signed_number()?;
            self.expect(&TokenKind::RParen)?;
            truncation = Some(TruncationSpec { method: METHODS[method], max_bond_dim, tolerance });
        }
        self.expect(&TokenKind::RParen)?;

        Ok(TensorNetworkSpec { network_type: KINDS[kind], bond_dimensions, truncation })
    }

    fn state(&mut self) -> Result<InitialState, ParseError> {
        const REPRS: [StateRepresentation; 4] = [
            StateRepresentation::Mps,
            StateRepresentation::Peps,
            StateRepresentation::Dense,
            StateRepresentation::Sparse,
        ];

        let name = self.ident("state name")?;
        self.expect(&TokenKind::Colon)?;
        let repr = self.choice(&["mps", "peps", "dense", "sparse"], "state representation")?;
        let dimensions = self.int_list()?;

        let mut hamiltonian = None;
        if self.eat_word("hamiltonian") {
            self.expect(&TokenKind::Eq)?;
            hamiltonian = Some(self.ident("hamiltonian operator name")?);
        }

        let mut topology_constraints = Vec::new();
        if self.eat_word("topology") {
            topology_constraints.push(self.topology_block()?);
        }

        Ok(InitialState {
            name,
            psi_0: StateSpec { representation: REPRS[repr], dimensions },
            hamiltonian,
            topology_constraints,
        })
    }

    /// `{ betti = [..], generators = [(dim = n, repr = "..."), ..] }`
    fn topology_block(&mut self) -> Result<TopologyConstraint, ParseError> {
        let mut out = TopologyConstraint::default();
        self.expect(&TokenKind::LBrace)?;

        while !self.eat(&TokenKind::RBrace) {
            let pos = self.pos();
            match self.choice(&["betti", "generators"], "topology item")? {
                0 => {
                    if out.betti_numbers.is_some() {
                        return Err(ParseError::Invalid { pos, message: "duplicate betti declaration".into() });
                    }
                    self.expect(&TokenKind::Eq)?;
                    out.betti_numbers = Some(self.int_list()?);
                }
                _ => {
                    if out.homology_generators.is_some() {
                        return Err(ParseError::Invalid { pos, message: "duplicate generators declaration".into() });
                    }
                    self.expect(&TokenKind::Eq)?;
                    self.expect(&TokenKind::LBracket)?;
                    let mut generators = vec![self.generator()?];
                    while self.eat(&TokenKind::Comma) {
                        generators.push(self.generator()?);
                    }
                    self.expect(&TokenKind::RBracket)?;
                    out.homology_generators = Some(generators);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace)?;
                break;
            }
        }

        Ok(out)
    }

    /// `(dim = n, repr = "...")`
    fn generator(&mut self) -> Result<HomologyGenerator, ParseError> {
        self.expect(&TokenKind::LParen)?;
        self.expect_word("dim")?;
        self.expect(&TokenKind::Eq)?;
        let dimension = self.int()?;
        self.expect(&TokenKind::Comma)?;
        self.expect_word("repr")?;
        self.expect(&TokenKind::Eq)?;
        let representation = self.string()?;
        self.expect(&TokenKind::RParen)?;
        Ok(HomologyGenerator { dimension, representation })
    }

    fn constraint(&mut self) -> Result<Constraint, ParseError> {
        const KINDS: [ConstraintType; 4] = [
            ConstraintType::EntropyBound,
            ConstraintType::StabilityThreshold,
            ConstraintType::TopologySurgeryThreshold,
            ConstraintType::HumanForceGate,
        ];

        let name = self.ident("constraint name")?;
        self.expect(&TokenKind::Colon)?;
        let i = self.choice(
            &["entropy_bound", "stability_threshold", "topology_surgery_threshold", "human_force_gate"],
            "constraint kind",
        )?;
        let expression = self.expr()?;
        Ok(Constraint { name, expression, constraint_type: KINDS[i] })
    }

    // -------------------------------------------------------------------------
    // expressions
    // -------------------------------------------------------------------------

    /// Whether the token at `offset` can begin an operand.
    fn starts_operand(&self, offset: usize) -> bool {
        match self.peek_kind_at(offset) {
            TokenKind::Number { .. } | TokenKind::LParen | TokenKind::Minus | TokenKind::Dagger => true,
            TokenKind::Ident(name) => !RESERVED.contains(&name.as_str()),
            _ => false,
        }
    }

    fn too_deep(&self) -> ParseError {
        ParseError::Invalid { pos: self.pos(), message: format!("expression nested too deeply (limit {MAX_NESTING})") }
    }

    /// Enter a recursive expression frame; bounds parser recursion.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.nesting -= 1;
    }

    /// Bound the depth of the tree being built; left-associative chains grow it without recursion.
    fn check_depth(&self, depth: usize) -> Result<usize, ParseError> {
        if depth > MAX_NESTING { Err(self.too_deep()) } else { Ok(depth) }
    }

    fn expr(&mut self) -> Result<Expression, ParseError> {
        self.sum().map(|(expr, _)| expr)
    }

    fn sum(&mut self) -> Result<(Expression, usize), ParseError> {
        let (mut left, mut depth) = self.product()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let (right, right_depth) = self.product()?;
            depth = self.check_depth(depth.max(right_depth) + 1)?;
            left = Expression::binary(op, left, right);
        }
        Ok((left, depth))
    }

    fn mul_op(&self) -> Option<BinaryOp> {
        let op = match &self.peek().kind {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::MiddleDot => BinaryOp::Dot,
            TokenKind::Otimes => BinaryOp::Tensor,
            TokenKind::Ident(word) => match word.as_str() {
                "dot" => BinaryOp::Dot,
                "otimes" | "tensor" => BinaryOp::Tensor,
                "x" => BinaryOp::Cross,
                _ => return None,
            },
            _ => return None,
        };
        // Word operators need a right operand; otherwise they are not operators here.
        if matches!(self.peek().kind, TokenKind::Ident(_)) && !self.starts_operand(1) {
            return None;
        }
        Some(op)
    }

    fn product(&mut self) -> Result<(Expression, usize), ParseError> {
        let (mut left, mut depth) = self.unary_expr()?;
        while let Some(op) = self.mul_op() {
            self.advance();
            let (right, right_depth) = self.unary_expr()?;
            depth = self.check_depth(depth.max(right_depth) + 1)?;
            left = Expression::binary(op, left, right);
        }
        Ok((left, depth))
    }

    fn unary_op(&self) -> Option<UnaryOp> {
        match &self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Dagger => Some(UnaryOp::Dagger),
            // `T - 1` subtracts from a variable named `T`.
            TokenKind::Ident(word) if self.starts_operand(1) && *self.peek_kind_at(1) != TokenKind::Minus => match word.as_str() {
                "dagger" => Some(UnaryOp::Dagger),
                "T" | "transpose" => Some(UnaryOp::Transpose),
                "conj" => Some(UnaryOp::Conjugate),
                "trace" => Some(UnaryOp::Trace),
                _ => None,
            },
            _ => None,
        }
    }

    fn unary_expr(&mut self) -> Result<(Expression, usize), ParseError> {
        if let Some(op) = self.unary_op() {
            self.advance();
            self.descend()?;
            let (expr, depth) = self.unary_expr()?;
            self.ascend();
            return Ok((Expression::unary(op, expr), self.check_depth(depth + 1)?));
        }
        self.power()
    }

    /// `primary [^ unary]`, right-associative.
    fn power(&mut self) -> Result<(Expression, usize), ParseError> {
        let (base, base_depth) = self.primary()?;
        if self.eat(&TokenKind::Caret) {
            self.descend()?;
            let (exponent, exponent_depth) = self.unary_expr()?;
            self.ascend();
            let depth = self.check_depth(base_depth.max(exponent_depth) + 1)?;
            return Ok((Expression::binary(BinaryOp::Pow, base, exponent), depth));
        }
        Ok((base, base_depth))
    }

    fn primary(&mut self) -> Result<(Expression, usize), ParseError> {
        match &self.peek().kind {
            TokenKind::Number { value, .. } => {
                let value = *value;
                self.advance();
                Ok((Expression::Constant(value), 1))
            }
            TokenKind::LParen => {
                self.advance();
                self.descend()?;
                let inner = self.sum()?;
                self.ascend();
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    self.descend()?;
                    let mut args = Vec::new();
                    let mut depth = 0;
                    if !self.eat(&TokenKind::RParen) {
                        loop {
                            let (arg, arg_depth) = self.sum()?;
                            depth = depth.max(arg_depth);
                            args.push(arg);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                        self.expect(&TokenKind::RParen)?;
                    }
                    self.ascend();
                    return Ok((Expression::FunctionCall { name, args }, self.check_depth(depth + 1)?));
                }
                Ok((Expression::Variable(name), 1))
            }
            _ => Err(self.error("expression")),
        }
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
