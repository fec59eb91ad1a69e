//! Parse and type-check a program.

use std::path::Path;

use anyhow::{Context, Result};
use latiao_common::types::ProgramId;
use latiao_engine::{Config, Program, Runtime, dataset};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

#[derive(Serialize)]
struct CheckOutput {
    valid: bool,
    calls: Vec<String>,
}

/// Run the check command.
///
/// Without a dataset every identifier is unresolvable, so only programs that
/// refer to no fields type-check; the grammar is checked either way.
pub fn run(source: &str, data: Option<&Path>, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let columns = match data {
        Some(path) => dataset::load(path).with_context(|| format!("cannot load {}", path.display()))?,
        None => Vec::new(),
    };
    let runtime = Runtime::new(config)?;
    let program = Program::new(ProgramId::new(0), columns)?;
    let calls = program.check(source, &runtime)?;

    match Format::from(format) {
        Format::Json => output::print_json(&CheckOutput { valid: true, calls }, quiet)?,
        Format::Table => {
            for call in &calls {
                output::status(call, quiet);
            }
            output::success("program is valid", quiet);
        }
    }
    Ok(())
}
