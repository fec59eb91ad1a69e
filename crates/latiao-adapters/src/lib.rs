//! # latiao-adapters
//!
//! Adapters layer for LaTiao: the program-text front end and the default
//! date-string parser.
//!
//! ## Modules
//!
//! - [`query`] - Lexer, AST and parser for LaTiao program text
//! - [`date`] - chrono-backed [`DateParser`](latiao_core::DateParser)

pub mod date;
pub mod query;

pub use date::ChronoDateParser;
