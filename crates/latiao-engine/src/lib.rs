//! # latiao-engine
//!
//! The execution side of LaTiao: programs, static resolution, depth-first
//! execution and the isolated worker that hosts talk to.
//!
//! ## Modules
//!
//! - [`config`] - Limits and defaults
//! - [`program`] - Programs and the runtime services they share
//! - [`query`] - Resolution and execution of parsed program text
//! - [`worker`] - Program store, message protocol, JSON router and worker thread
//! - [`dataset`] - Loading origin columns from JSON and CSV files

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dataset;
pub mod program;
pub mod query;
pub mod worker;

pub use config::Config;
pub use program::{Program, Runtime};
pub use worker::{ProgramStore, Request, Response, Worker, route_json};
