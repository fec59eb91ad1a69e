//! CLI command implementations.

pub mod check;
pub mod ops;
pub mod run;
pub mod serve;
