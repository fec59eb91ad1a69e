//! The token model shared by the parser, resolver, and operators.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::date::DateDimensions;
use super::field::{FieldMode, FieldToken};
use crate::utils::error::SourceSpan;

/// Structural type of a token, used for overload resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "mode")]
pub enum TokenType {
    /// String literal.
    String,
    /// Number literal.
    Number,
    /// Column of the given mode.
    Field(FieldMode),
    /// Ordered bundle of columns.
    FieldList,
    /// Date handle.
    Date,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("str"),
            Self::Number => f.write_str("num"),
            Self::Field(mode) => write!(f, "{mode}"),
            Self::FieldList => f.write_str("fields"),
            Self::Date => f.write_str("date"),
        }
    }
}

/// Opaque handle over a linearized timestamp column.
#[derive(Debug, Clone, PartialEq)]
pub struct DateToken {
    /// The millisecond timestamp column.
    pub source: FieldToken,
    /// Calendar dimensions still accessible through this handle.
    pub dims: DateDimensions,
}

/// Marks a call as the right side of an `out`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Export {
    /// Name chosen by the user, if any.
    pub name: Option<String>,
}

/// A resolved operator call.
#[derive(Debug, Clone, PartialEq)]
pub struct OpToken {
    /// Operator name, including the `$` sigil.
    pub op: String,
    /// Index of the chosen overload among those registered under `op`.
    pub overload: usize,
    /// Arguments; nested calls are evaluated before this one.
    pub args: Vec<Token>,
    /// Result type of the chosen overload.
    pub output: TokenType,
    /// Set when the result is exported.
    pub export: Option<Export>,
    /// Position in the program text.
    pub span: Option<SourceSpan>,
}

/// A value flowing through a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// String literal.
    Str(String),
    /// Number literal.
    Num(f64),
    /// Column reference.
    Field(FieldToken),
    /// Ordered, fixed-arity bundle of columns.
    FieldList(Vec<FieldToken>),
    /// Date handle.
    Date(DateToken),
    /// Pending call.
    Op(OpToken),
}

impl Token {
    /// Returns the structural type of this token.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::Str(_) => TokenType::String,
            Self::Num(_) => TokenType::Number,
            Self::Field(f) => TokenType::Field(f.mode),
            Self::FieldList(_) => TokenType::FieldList,
            Self::Date(_) => TokenType::Date,
            Self::Op(op) => op.output,
        }
    }

    /// Returns the string literal, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number literal, if this is one.
    #[must_use]
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the field, if this is one.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldToken> {
        match self {
            Self::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the date handle, if this is one.
    #[must_use]
    pub fn as_date(&self) -> Option<&DateToken> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }
}
