//! # LaTiao
//!
//! A small language for deriving new columns from a tabular dataset.
//!
//! A program binds a snapshot of columns once; every execution of LaTiao text
//! against it appends derived columns and returns the ones marked `out`.
//! Operators are resolved statically by the types of their arguments, so
//! type errors surface before anything runs.
//!
//! Start with [`ProgramStore`] for in-process use, or [`Worker`] to host the
//! store on its own thread behind a message protocol.
//!
//! ## Quick Start
//!
//! ```rust
//! use latiao::{Column, ColumnData, Config, FieldMode, FieldToken, ProgramStore};
//!
//! let store = ProgramStore::new(Config::default())?;
//! let price = Column::new(
//!     FieldToken::origin("price", "price", FieldMode::Vec),
//!     ColumnData::Numbers(vec![1.0, 2.0, f64::NAN, 100.0]),
//! )?;
//! let program = store.create_program(vec![price])?;
//!
//! let out = store.execute(program, "out clean = $zeroFill(price)")?;
//! assert_eq!(out[0].data.as_numbers(), Some(&[1.0, 2.0, 0.0, 100.0][..]));
//! # Ok::<(), latiao::Error>(())
//! ```

// Re-export the engine API
pub use latiao_engine::worker::{ExecuteResult, Response, ResponseData};
pub use latiao_engine::{Config, Program, ProgramStore, Request, Runtime, Worker, dataset, route_json};

// Extension points
pub use latiao_core::{DateParser, ExpressionEvaluator, FieldStatistics, MetaHook, OperatorRegistry};

// Parsing and the default date parser
pub use latiao_adapters::ChronoDateParser;
pub use latiao_adapters::query::latiao::parse;

// Core types
pub use latiao_common::types::{
    Column, ColumnData, DateDimension, FieldId, FieldMode, FieldToken, ProgramId,
};
pub use latiao_common::utils::error::{Error, QueryErrorKind, Result, SourceLocation};
