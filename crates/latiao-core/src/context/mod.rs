//! Execution context: what an operator may see and do.
//!
//! Operators read columns through [`ExecutionContext::col`] and produce new
//! ones only through [`ExecutionContext::write`]. [`ProgramContext`] is the
//! standard implementation over a [`ColumnStore`].

mod store;

pub use store::ColumnStore;

use std::sync::Arc;

use latiao_common::types::{ColumnData, FieldToken};
use latiao_common::utils::error::{Error, Result};

use crate::eval::ExpressionEvaluator;

/// Turns date strings into epoch milliseconds.
pub trait DateParser: Send + Sync {
    /// Parses `text`, returning `None` when it is not a recognizable date.
    fn parse(&self, text: &str) -> Option<f64>;
}

/// Capabilities handed to every operator.
pub trait ExecutionContext {
    /// Number of rows of every column.
    fn row_count(&self) -> usize;

    /// Looks a field up by exact id.
    fn field(&self, fid: &str) -> Option<FieldToken>;

    /// Resolves an identifier to a field, or fails with a name error.
    fn resolve_fid(&self, ident: &str) -> Result<FieldToken>;

    /// Reads one column.
    fn col(&self, field: &FieldToken) -> Result<Arc<ColumnData>>;

    /// Reads several columns, in order.
    fn cols(&self, fields: &[FieldToken]) -> Result<Vec<Arc<ColumnData>>> {
        fields.iter().map(|f| self.col(f)).collect()
    }

    /// Writes a new derived column. Each id may be written once.
    fn write(&self, field: FieldToken, data: ColumnData) -> Result<()>;

    /// Date-string parser.
    fn date_parser(&self) -> &dyn DateParser;

    /// Evaluator for user expressions.
    fn evaluator(&self) -> &dyn ExpressionEvaluator;

    /// Separator `$concat` uses when none is given.
    fn separator(&self) -> &str {
        ","
    }
}

/// [`ExecutionContext`] over a [`ColumnStore`].
pub struct ProgramContext<'a> {
    store: &'a ColumnStore,
    date_parser: &'a dyn DateParser,
    evaluator: &'a dyn ExpressionEvaluator,
    separator: &'a str,
}

impl<'a> ProgramContext<'a> {
    /// Creates a context.
    pub fn new(
        store: &'a ColumnStore,
        date_parser: &'a dyn DateParser,
        evaluator: &'a dyn ExpressionEvaluator,
    ) -> Self {
        Self {
            store,
            date_parser,
            evaluator,
            separator: ",",
        }
    }

    /// Overrides the default `$concat` separator.
    #[must_use]
    pub fn with_separator(mut self, separator: &'a str) -> Self {
        self.separator = separator;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &'a ColumnStore {
        self.store
    }
}

impl ExecutionContext for ProgramContext<'_> {
    fn row_count(&self) -> usize {
        self.store.row_count()
    }

    fn field(&self, fid: &str) -> Option<FieldToken> {
        self.store.field(fid)
    }

    fn resolve_fid(&self, ident: &str) -> Result<FieldToken> {
        self.store
            .resolve(ident)
            .ok_or_else(|| Error::name(format!("Cannot find field \"{ident}\".")))
    }

    fn col(&self, field: &FieldToken) -> Result<Arc<ColumnData>> {
        self.store
            .data(field.fid.as_str())
            .ok_or_else(|| Error::name(format!("Cannot find column \"{}\".", field.fid)))
    }

    fn write(&self, field: FieldToken, data: ColumnData) -> Result<()> {
        self.store.write(field, data)
    }

    fn date_parser(&self) -> &dyn DateParser {
        self.date_parser
    }

    fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator
    }

    fn separator(&self) -> &str {
        self.separator
    }
}
