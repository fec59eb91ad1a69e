//! Run programs over a dataset.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use latiao_common::types::Column;
use latiao_core::FieldStatistics;
use latiao_engine::worker::ExecuteResult;
use latiao_engine::{Config, ProgramStore, dataset};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Arguments of `latiao run`.
pub struct RunArgs<'a> {
    pub data: &'a Path,
    pub exprs: &'a [String],
    pub file: Option<&'a Path>,
    pub rows: usize,
    pub stats: bool,
}

#[derive(Serialize)]
struct ProgramOutput<'a> {
    source: &'a str,
    #[serde(flatten)]
    result: ExecuteResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    statistics: Vec<FieldStatistics>,
}

/// Run the run command.
pub fn run(args: &RunArgs<'_>, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let mut sources: Vec<String> = args.exprs.to_vec();
    if let Some(file) = args.file {
        let text = fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;
        sources.push(text);
    }

    let columns = dataset::load(args.data).with_context(|| format!("cannot load {}", args.data.display()))?;
    let store = ProgramStore::new(config)?;
    let id = store.create_program(columns)?;

    let fmt: Format = format.into();
    let mut outputs = Vec::with_capacity(sources.len());
    for source in &sources {
        let columns = store.execute(id, source)?;
        let statistics = if args.stats { compute_statistics(&columns) } else { Vec::new() };
        match fmt {
            Format::Json => outputs.push(ProgramOutput {
                source,
                result: ExecuteResult::from(columns),
                statistics,
            }),
            Format::Table => {
                output::print_columns(&columns, args.rows, quiet);
                if args.stats {
                    let named = columns
                        .iter()
                        .zip(statistics)
                        .map(|(c, s)| (c.token.name.clone(), s))
                        .collect::<Vec<_>>();
                    output::print_statistics(&named, quiet);
                }
            }
        }
    }

    if let Format::Json = fmt {
        output::print_json(&outputs, quiet)?;
    }
    Ok(())
}

fn compute_statistics(columns: &[Column]) -> Vec<FieldStatistics> {
    columns.iter().map(FieldStatistics::compute).collect()
}
