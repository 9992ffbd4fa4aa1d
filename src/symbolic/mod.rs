//! Symbolic math: LaTeX parsing, canonical simplification and numeric evaluation.
//!
//! The [`SymbolicParser`] trait is the seam between the expression pipeline and
//! the parser implementation, so tests can substitute their own.

pub mod eval;
pub mod expr;
mod kernel;
pub mod latex;
pub mod poly;
pub mod rational;
pub mod simplify;

pub use eval::{CompiledFunction, EvaluationError};
pub use expr::{Constant, Expr, Function, SymbolicExpression};
pub use latex::LatexParser;
pub use rational::Rational;

use thiserror::Error;

/// A LaTeX string that is not a valid symbolic expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the LaTeX source
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Failure of a stage that needs a parsed (and possibly evaluated) expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolicError {
    #[error("Invalid LaTeX: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl SymbolicError {
    /// Stable identifier used in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            SymbolicError::Parse(_) => "parse",
            SymbolicError::Evaluation(_) => "evaluation",
        }
    }
}

/// Turns a LaTeX string into a symbolic expression tree
pub trait SymbolicParser: Send + Sync {
    fn parse(&self, latex: &str) -> Result<SymbolicExpression, ParseError>;
}
