//! List the operator library.

use anyhow::{Result, bail};
use latiao_core::OperatorRegistry;
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

#[derive(Serialize)]
struct OperatorOutput {
    name: &'static str,
    signature: String,
    returns: String,
}

/// Run the ops command.
pub fn run(name: Option<&str>, format: OutputFormat, quiet: bool) -> Result<()> {
    let registry = OperatorRegistry::with_builtins()?;
    let wanted = name.map(|n| if n.starts_with('$') { n.to_string() } else { format!("${n}") });

    let ops: Vec<OperatorOutput> = registry
        .public_overloads()
        .into_iter()
        .filter(|op| wanted.as_deref().is_none_or(|w| op.name == w))
        .map(|op| OperatorOutput {
            name: op.name,
            signature: op.to_string(),
            returns: op.returns.to_string(),
        })
        .collect();
    if let Some(w) = &wanted
        && ops.is_empty()
    {
        bail!("unknown operator {w}");
    }

    match Format::from(format) {
        Format::Json => output::print_json(&ops, quiet)?,
        Format::Table => {
            if quiet {
                return Ok(());
            }
            let mut table = output::create_table();
            output::add_header(&mut table, &["Signature", "Returns"]);
            for op in &ops {
                table.add_row(vec![op.signature.clone(), op.returns.clone()]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
