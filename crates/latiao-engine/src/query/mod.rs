//! Query processing pipeline.
//!
//! - **Resolver**: binds identifiers and overloads, desugars arithmetic and
//!   date member access
//! - **Executor**: runs the resolved calls depth-first and collects exports

pub mod executor;
pub mod resolver;

pub use executor::Executor;
pub use resolver::Resolver;
