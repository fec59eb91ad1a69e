//! # latiao-common
//!
//! Foundation layer for LaTiao: tokens, field/column types, identifiers and errors.
//!
//! Every other LaTiao crate depends on this one. It has no internal
//! dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Token model, fields, columns, calendar dimensions and ids
//! - [`utils`] - Error taxonomy, source locations and hashing helpers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{
    Column, ColumnData, DateDimension, DateDimensions, DateToken, FieldId, FieldMode, FieldToken,
    OpToken, ProgramId, Token, TokenType,
};
pub use utils::error::{Error, QueryError, QueryErrorKind, Result, SourceLocation, SourceSpan};
