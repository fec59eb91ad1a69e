//! The built-in operator library.
//!
//! Every operator reads its inputs through the [`ExecutionContext`] and writes
//! each output column exactly once. Outputs get a fresh derived id, a
//! readable name, and provenance pointing at the visible fields they were
//! computed from.
//!
//! - `clean`: `$zeroFill`, `$meanFill`, `$nearestClip`, `$meanClip`, `$boxClip`
//! - `scale`: `$normalize`, `$log`
//! - `predicate`: `$isNaN`, `$isZero`
//! - `convert`: `$set`, `$vec`, `$text`, `$bool`, `$id`, `$order`
//! - `text`: `$concat`, `$match`, `$replace`
//! - `date`: `$toDate`, `$isValidDate`, `$__projDate`, `$__sliceDate`
//! - `pointwise`: `$map`, `$test`, `$partition`
//! - `arithmetic`: `$__add`, `$__minus`, `$__multiply`, `$__divide`

mod arithmetic;
mod clean;
mod convert;
mod date;
mod pointwise;
mod predicate;
mod scale;
mod text;

use std::sync::Arc;

use latiao_common::types::{
    ColumnData, DateToken, ExtDetail, ExtInfo, FieldId, FieldMode, FieldToken, Token, TokenType,
};
use latiao_common::utils::error::{Error, Result};

use crate::context::ExecutionContext;
use crate::lineage::resolve_dependencies;
use crate::registry::OperatorRegistry;

pub use date::project;

pub(crate) const SET: TokenType = TokenType::Field(FieldMode::Set);
pub(crate) const VEC: TokenType = TokenType::Field(FieldMode::Vec);
pub(crate) const TEXT: TokenType = TokenType::Field(FieldMode::Text);
pub(crate) const BOOL: TokenType = TokenType::Field(FieldMode::Bool);
pub(crate) const STR: TokenType = TokenType::String;
pub(crate) const NUM: TokenType = TokenType::Number;
pub(crate) const DATE: TokenType = TokenType::Date;
pub(crate) const FIELDS: TokenType = TokenType::FieldList;

/// Registers every built-in operator.
pub fn register_builtins(registry: &mut OperatorRegistry) -> Result<()> {
    clean::register(registry)?;
    scale::register(registry)?;
    predicate::register(registry)?;
    convert::register(registry)?;
    text::register(registry)?;
    date::register(registry)?;
    pointwise::register(registry)?;
    arithmetic::register(registry)?;
    Ok(())
}

fn bad_arg(n: usize, expected: &str) -> Error {
    Error::Internal(format!("argument {n} is not a {expected}"))
}

pub(crate) fn field_arg(args: &[Token], n: usize) -> Result<&FieldToken> {
    args.get(n).and_then(Token::as_field).ok_or_else(|| bad_arg(n, "field"))
}

pub(crate) fn str_arg(args: &[Token], n: usize) -> Result<&str> {
    args.get(n).and_then(Token::as_str).ok_or_else(|| bad_arg(n, "string"))
}

pub(crate) fn num_arg(args: &[Token], n: usize) -> Result<f64> {
    args.get(n).and_then(Token::as_num).ok_or_else(|| bad_arg(n, "number"))
}

pub(crate) fn date_arg(args: &[Token], n: usize) -> Result<&DateToken> {
    args.get(n).and_then(Token::as_date).ok_or_else(|| bad_arg(n, "date"))
}

/// Borrows numeric rows.
pub(crate) fn numbers(data: &ColumnData) -> Result<&[f64]> {
    data.as_numbers()
        .ok_or_else(|| Error::Internal("expected a numeric column".to_string()))
}

/// Borrows string rows.
pub(crate) fn texts(data: &ColumnData) -> Result<&[String]> {
    data.as_texts()
        .ok_or_else(|| Error::Internal("expected a text column".to_string()))
}

/// Reads a numeric column.
pub(crate) fn read_numbers(ctx: &dyn ExecutionContext, field: &FieldToken) -> Result<Arc<ColumnData>> {
    let data = ctx.col(field)?;
    numbers(&data)?;
    Ok(data)
}

/// Creates a hidden output field whose provenance is the visible ancestry of
/// `sources`.
pub(crate) fn derive(
    ctx: &dyn ExecutionContext,
    op: &str,
    name: String,
    mode: FieldMode,
    sources: &[&FieldToken],
    detail: ExtDetail,
) -> FieldToken {
    let fids: Vec<FieldId> = sources.iter().map(|f| f.fid.clone()).collect();
    let ext = ExtInfo::new(format!("LaTiao.{op}"), resolve_dependencies(&fids, ctx)).with_detail(detail);
    FieldToken::derived(name, mode, ext)
}

/// Writes `data` under `field` and returns the field token.
pub(crate) fn emit(ctx: &dyn ExecutionContext, field: FieldToken, data: ColumnData) -> Result<Token> {
    ctx.write(field.clone(), data)?;
    Ok(Token::Field(field))
}

/// Mean of the finite values, NaN if there are none.
pub(crate) fn finite_mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}
