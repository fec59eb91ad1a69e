//! Depth-first execution of resolved calls.

use indexmap::IndexSet;
use latiao_common::types::{DateExpansion, FieldId, FieldToken, OpToken, Token};
use latiao_common::utils::error::{Error, Result};
use latiao_core::{OperatorRegistry, ProgramContext};
use tracing::debug;

/// Runs resolved calls against a program context.
pub struct Executor<'a> {
    registry: &'a OperatorRegistry,
    ctx: &'a ProgramContext<'a>,
}

impl<'a> Executor<'a> {
    /// Creates an executor.
    pub fn new(registry: &'a OperatorRegistry, ctx: &'a ProgramContext<'a>) -> Self {
        Self { registry, ctx }
    }

    /// Executes every root in order and returns the exported field ids, in
    /// first-export order.
    ///
    /// Columns written before a failure stay in the store.
    pub fn execute(&self, roots: Vec<OpToken>) -> Result<Vec<FieldId>> {
        let mut exported = IndexSet::new();
        for root in roots {
            self.run(root, &mut exported)?;
        }
        Ok(exported.into_iter().collect())
    }

    fn run(&self, call: OpToken, exported: &mut IndexSet<FieldId>) -> Result<Token> {
        let OpToken {
            op,
            overload,
            args,
            export,
            span,
            ..
        } = call;

        let args = args
            .into_iter()
            .map(|arg| match arg {
                Token::Op(inner) => self.run(inner, exported),
                other => Ok(other),
            })
            .collect::<Result<Vec<_>>>()?;

        let operator = self
            .registry
            .get(&op, overload)
            .ok_or_else(|| Error::Internal(format!("overload {overload} of {op} is not registered")))?;
        debug!(op = %operator, "executing operator");
        let result = (operator.exec)(self.ctx, &args).map_err(|e| e.with_span(span))?;

        if let Some(export) = export {
            self.export(&result, export.name.as_deref(), exported)?;
        }
        Ok(result)
    }

    fn export(&self, result: &Token, name: Option<&str>, exported: &mut IndexSet<FieldId>) -> Result<()> {
        match result {
            Token::Field(field) => self.export_field(field, name, exported),
            Token::Date(date) => self.export_field(&date.source, name, exported),
            Token::FieldList(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    let name = name.map(|n| match field.date_expansion() {
                        Some(DateExpansion::Dim(dim)) => format!("{n}.{dim}"),
                        _ => format!("{n}.{}", i + 1),
                    });
                    self.export_field(field, name.as_deref(), exported)?;
                }
                Ok(())
            }
            other => Err(Error::Internal(format!("cannot export a {}", other.token_type()))),
        }
    }

    fn export_field(&self, field: &FieldToken, name: Option<&str>, exported: &mut IndexSet<FieldId>) -> Result<()> {
        let field = self.ctx.store().export(&field.fid, name)?;
        debug!(fid = %field.fid, name = %field.name, "exported field");
        exported.insert(field.fid);
        Ok(())
    }
}
