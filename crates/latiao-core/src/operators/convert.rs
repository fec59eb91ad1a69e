//! Mode conversions, identity copy, and ranking.

use std::cmp::Ordering;

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, FieldToken, Token, TokenType};
use latiao_common::utils::error::Result;

use super::{BOOL, SET, TEXT, VEC, derive, emit, field_arg};
use crate::coerce::{format_number, parse_number};
use crate::context::ExecutionContext;
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    for ty in [VEC, TEXT, BOOL] {
        registry.register(Operator::new("$set", &[ty], SET, to_set))?;
    }
    for ty in [SET, TEXT, BOOL] {
        registry.register(Operator::new("$vec", &[ty], VEC, to_vec))?;
    }
    for ty in [SET, VEC, BOOL] {
        registry.register(Operator::new("$text", &[ty], TEXT, to_text))?;
    }
    for ty in [SET, VEC, TEXT] {
        registry.register(Operator::new("$bool", &[ty], BOOL, to_bool))?;
    }
    for mode in [FieldMode::Set, FieldMode::Vec, FieldMode::Text, FieldMode::Bool] {
        let ty = TokenType::Field(mode);
        registry.register(Operator::new("$id", &[ty], ty, id))?;
    }
    for ty in [VEC, SET, TEXT] {
        registry.register(Operator::new("$order", &[ty], SET, order))?;
    }
    Ok(())
}

/// Numeric view of a column of any mode.
fn as_numbers(data: &ColumnData) -> Vec<f64> {
    match data {
        ColumnData::Numbers(v) => v.clone(),
        ColumnData::Texts(v) => v.iter().map(|s| parse_number(s)).collect(),
    }
}

fn convert(
    ctx: &dyn ExecutionContext,
    args: &[Token],
    op: &str,
    mode: FieldMode,
    f: impl Fn(&FieldToken, &ColumnData) -> ColumnData,
) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = ctx.col(source)?;
    let out = f(source, &data);
    let field = derive(
        ctx,
        op,
        format!("{} ({mode})", source.name),
        mode,
        &[source],
        ExtDetail::None,
    );
    emit(ctx, field, out)
}

fn to_set(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    convert(ctx, args, "$set", FieldMode::Set, |_, data| ColumnData::Numbers(as_numbers(data)))
}

fn to_vec(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    convert(ctx, args, "$vec", FieldMode::Vec, |_, data| ColumnData::Numbers(as_numbers(data)))
}

fn to_text(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    convert(ctx, args, "$text", FieldMode::Text, |source, data| {
        let out = match data {
            ColumnData::Texts(v) => v.clone(),
            ColumnData::Numbers(v) if source.mode == FieldMode::Bool => v
                .iter()
                .map(|&x| if x != 0.0 && !x.is_nan() { "true" } else { "false" }.to_string())
                .collect(),
            ColumnData::Numbers(v) => v.iter().map(|&x| format_number(x)).collect(),
        };
        ColumnData::Texts(out)
    })
}

fn to_bool(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    convert(ctx, args, "$bool", FieldMode::Bool, |_, data| {
        let out = match data {
            ColumnData::Texts(v) => v.iter().map(|s| if s.is_empty() { 0.0 } else { 1.0 }).collect(),
            ColumnData::Numbers(v) => v
                .iter()
                .map(|&x| if x.is_finite() && x != 0.0 { 1.0 } else { 0.0 })
                .collect(),
        };
        ColumnData::Numbers(out)
    })
}

fn id(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = ctx.col(source)?;
    let field = derive(ctx, "$id", source.name.clone(), source.mode, &[source], ExtDetail::None);
    emit(ctx, field, (*data).clone())
}

/// 1-based dense ranks; NaN stays NaN.
pub(crate) fn dense_rank(data: &ColumnData) -> Vec<f64> {
    match data {
        ColumnData::Numbers(v) => {
            let mut distinct: Vec<f64> = v.iter().copied().filter(|x| !x.is_nan()).collect();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup_by(|a, b| a == b);
            v.iter()
                .map(|x| {
                    if x.is_nan() {
                        return f64::NAN;
                    }
                    let pos = distinct.partition_point(|d| d.partial_cmp(x) == Some(Ordering::Less));
                    (pos + 1) as f64
                })
                .collect()
        }
        ColumnData::Texts(v) => {
            let mut distinct: Vec<&str> = v.iter().map(String::as_str).collect();
            distinct.sort_unstable();
            distinct.dedup();
            v.iter()
                .map(|s| (distinct.partition_point(|d| *d < s.as_str()) + 1) as f64)
                .collect()
        }
    }
}

fn order(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = ctx.col(source)?;
    let out = dense_rank(&data);
    let field = derive(
        ctx,
        "$order",
        format!("{} (order)", source.name),
        FieldMode::Set,
        &[source],
        ExtDetail::None,
    );
    emit(ctx, field, ColumnData::Numbers(out))
}
