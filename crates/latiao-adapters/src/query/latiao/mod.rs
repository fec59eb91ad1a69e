//! LaTiao program text.
//!
//! A program is a single statement that derives new columns from existing
//! ones, for example `out score = $normalize($zeroFill(price))`. Several
//! exports can be joined with commas. Field names that are not plain words
//! are written in backticks.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, ExprKind, Program};
pub use parser::Parser;

use latiao_common::utils::error::Result;

/// Parses program text.
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source).parse()
}
