//! Filling and clipping of numeric columns.

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, Token};
use latiao_common::utils::error::Result;

use super::{NUM, VEC, derive, emit, field_arg, finite_mean, num_arg, numbers, read_numbers};
use crate::context::ExecutionContext;
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    registry.register(Operator::new("$zeroFill", &[VEC], VEC, zero_fill))?;
    registry.register(Operator::new("$meanFill", &[VEC], VEC, mean_fill))?;
    registry.register(Operator::new("$nearestClip", &[VEC, NUM, NUM], VEC, nearest_clip))?;
    registry.register(Operator::new("$meanClip", &[VEC, NUM, NUM], VEC, mean_clip))?;
    registry.register(Operator::new("$boxClip", &[VEC], VEC, box_clip))?;
    Ok(())
}

/// Applies `f` to every row of the single vec argument.
fn map_vec(
    ctx: &dyn ExecutionContext,
    args: &[Token],
    op: &str,
    label: &str,
    f: impl Fn(&[f64]) -> Vec<f64>,
) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = read_numbers(ctx, source)?;
    let out = f(numbers(&data)?);
    let field = derive(
        ctx,
        op,
        format!("Cleaned {} ({label})", source.name),
        FieldMode::Vec,
        &[source],
        ExtDetail::None,
    );
    emit(ctx, field, ColumnData::Numbers(out))
}

fn zero_fill(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    map_vec(ctx, args, "$zeroFill", "zero fill", |col| {
        col.iter().map(|&x| if x.is_finite() { x } else { 0.0 }).collect()
    })
}

fn mean_fill(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    map_vec(ctx, args, "$meanFill", "mean fill", |col| {
        let mean = finite_mean(col);
        col.iter().map(|&x| if x.is_finite() { x } else { mean }).collect()
    })
}

fn nearest_clip(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let (min, max) = (num_arg(args, 1)?, num_arg(args, 2)?);
    map_vec(ctx, args, "$nearestClip", &format!("{min} ~ {max} nearest"), |col| {
        col.iter()
            .map(|&x| {
                if !x.is_finite() {
                    x
                } else if x < min {
                    min
                } else if x > max {
                    max
                } else {
                    x
                }
            })
            .collect()
    })
}

fn mean_clip(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let (min, max) = (num_arg(args, 1)?, num_arg(args, 2)?);
    map_vec(ctx, args, "$meanClip", &format!("{min} ~ {max} mean"), |col| {
        let mean = finite_mean(col);
        col.iter()
            .map(|&x| if x.is_finite() && (x < min || x > max) { mean } else { x })
            .collect()
    })
}

fn box_clip(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    map_vec(ctx, args, "$boxClip", "box clip", box_clip_values)
}

/// Clamps finite values to `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub(crate) fn box_clip_values(col: &[f64]) -> Vec<f64> {
    let mut ranked: Vec<f64> = col.iter().copied().filter(|x| x.is_finite()).collect();
    if ranked.is_empty() {
        return col.to_vec();
    }
    ranked.sort_by(f64::total_cmp);

    let n = ranked.len();
    let at = |pos: f64| ranked[(pos as usize).min(n - 1)];
    let quarter = n as f64 / 4.0;
    let three_quarters = 3.0 * n as f64 / 4.0;
    let q1 = 0.75 * at(quarter.floor()) + 0.25 * at(quarter.ceil());
    let q3 = 0.25 * at(three_quarters.floor()) + 0.75 * at(three_quarters.ceil());
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    col.iter()
        .map(|&x| {
            if !x.is_finite() {
                x
            } else if x < low {
                low
            } else if x > high {
                high
            } else {
                x
            }
        })
        .collect()
}
