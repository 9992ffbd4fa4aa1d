//! LaTeX front end: tokenizer, recursive-descent parser and printer.
//!
//! The parser accepts the subset of LaTeX that handwriting recognizers emit for
//! single expressions: arithmetic, implicit products, `\frac`, `\sqrt`,
//! powers, subscripted symbols, Greek letters, elementary functions and one
//! optional `=`. A bare `e` is Euler's number and `\log` is the natural log.

mod lexer;
mod parser;
mod printer;

pub use printer::{expr_to_latex, to_latex};

use super::{ParseError, SymbolicExpression, SymbolicParser};

/// Default [`SymbolicParser`] backed by the built-in LaTeX grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexParser;

impl SymbolicParser for LatexParser {
    fn parse(&self, latex: &str) -> Result<SymbolicExpression, ParseError> {
        parser::parse(latex)
    }
}
