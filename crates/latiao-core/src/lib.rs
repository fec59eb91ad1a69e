//! # latiao-core
//!
//! Core layer for LaTiao: the column store programs run against, the operator
//! registry and built-in operator library, and the sandboxed evaluator behind
//! `$map`, `$test` and `$partition`.
//!
//! This crate depends only on `latiao-common`.
//!
//! ## Modules
//!
//! - [`context`] - Execution context contract and the in-memory column store
//! - [`registry`] - Operator overloads and structural resolution
//! - [`operators`] - The built-in operator library
//! - [`eval`] - Sandboxed pointwise expression evaluator
//! - [`lineage`] - Dependency resolution over field provenance
//! - [`statistics`] - Per-field summary statistics and the meta hook
//! - [`coerce`] - Number parsing and formatting shared by conversions and the evaluator

pub mod coerce;
pub mod context;
pub mod eval;
pub mod lineage;
pub mod operators;
pub mod registry;
pub mod statistics;

// Re-export commonly used types
pub use context::{ColumnStore, DateParser, ExecutionContext, ProgramContext};
pub use eval::{CompiledExpression, ExpressionEvaluator, SandboxEvaluator, Value};
pub use lineage::resolve_dependencies;
pub use registry::{ExecFn, Operator, OperatorRegistry};
pub use statistics::{FieldStatistics, Histogram, HistogramBucket, LoggingMetaHook, MetaHook};
