//! Sandboxed pointwise evaluator.
//!
//! `$map`, `$test` and `$partition` take a user expression over the row value
//! `d` and the row index `i`. The expression is compiled once by an
//! [`ExpressionEvaluator`] and then evaluated for every row. The default
//! [`SandboxEvaluator`] is a small tree-walking interpreter: it has no ambient
//! scope, no I/O, no loops and a bounded nesting depth, so every evaluation
//! terminates.
//!
//! Supported syntax: number and string literals, `true`, `false`, `NaN`,
//! `Infinity`, unary `- + !`, binary `+ - * / % **`, comparisons
//! (`< <= > >= == != === !==`), `&&`, `||`, `?:`, and a fixed set of calls:
//! `Math.*`, `Number`, `String`, `isNaN`, `isFinite`, `d.length` and the
//! common string methods.

mod syntax;
mod vm;

use std::fmt;

use latiao_common::utils::error::{Error, Result};
use thiserror::Error;

use crate::coerce::{format_number, parse_number};

/// Default nesting limit of compiled expressions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A value inside the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of reading a property that does not exist.
    Undefined,
    /// Boolean.
    Bool(bool),
    /// Number.
    Num(f64),
    /// String.
    Str(String),
}

impl Value {
    /// Numeric value, following host coercion rules.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Num(n) => *n,
            Self::Str(s) => parse_number(s),
        }
    }

    /// Truthiness: `0`, NaN, `""`, `false` and undefined are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined => false,
            Self::Bool(b) => *b,
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Num(n) => f.write_str(&format_number(*n)),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Failure while compiling or evaluating a user expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Malformed expression.
    #[error("unexpected {found} at offset {offset}")]
    Syntax {
        /// What was found.
        found: String,
        /// Byte offset into the expression.
        offset: usize,
    },
    /// An identifier outside the whitelist.
    #[error("{0} is not defined")]
    UnknownIdentifier(String),
    /// Nesting beyond the configured limit.
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    /// Method call on a value that has no such method.
    #[error("{0} is not a function")]
    NotAFunction(String),
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Error::runtime(format!("Invalid expression: {err}."))
    }
}

/// An expression ready to be evaluated per row.
pub trait CompiledExpression: Send + Sync {
    /// Evaluates with `d` bound to the row value and `i` to the row index.
    fn eval(&self, d: &Value, i: usize) -> Result<Value>;
}

/// Compiles user expressions.
pub trait ExpressionEvaluator: Send + Sync {
    /// Compiles `source`, failing with a runtime error if it is malformed.
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledExpression>>;
}

/// The built-in tree-walking evaluator.
#[derive(Debug, Clone, Copy)]
pub struct SandboxEvaluator {
    max_depth: usize,
}

impl SandboxEvaluator {
    /// Creates an evaluator with the given nesting limit.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// The nesting limit.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for SandboxEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ExpressionEvaluator for SandboxEvaluator {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledExpression>> {
        let expr = syntax::parse(source, self.max_depth)?;
        Ok(Box::new(vm::Compiled::new(expr, self.max_depth)))
    }
}
