//! Rescaling of numeric columns.

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, Token};
use latiao_common::utils::error::Result;

use super::{NUM, VEC, derive, emit, field_arg, num_arg, numbers, read_numbers};
use crate::coerce::format_number;
use crate::context::ExecutionContext;
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    registry.register(Operator::new("$normalize", &[VEC], VEC, normalize))?;
    registry.register(Operator::new("$log", &[VEC], VEC, log))?;
    registry.register(Operator::new("$log", &[VEC, NUM], VEC, log_base))?;
    Ok(())
}

/// Standard score with the population deviation of the finite values.
pub(crate) fn standardize(col: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = col.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return col.to_vec();
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let sigma = (finite.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

    col.iter()
        .map(|&x| {
            if !x.is_finite() {
                x
            } else if sigma == 0.0 {
                0.0
            } else {
                (x - mean) / sigma
            }
        })
        .collect()
}

fn normalize(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = read_numbers(ctx, source)?;
    let out = standardize(numbers(&data)?);
    let field = derive(
        ctx,
        "$normalize",
        format!("{} (normalized)", source.name),
        FieldMode::Vec,
        &[source],
        ExtDetail::None,
    );
    emit(ctx, field, ColumnData::Numbers(out))
}

fn log_with(ctx: &dyn ExecutionContext, args: &[Token], base: Option<f64>) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = read_numbers(ctx, source)?;
    let out = numbers(&data)?
        .iter()
        .map(|&x| match base {
            Some(b) => x.ln() / b.ln(),
            None => x.ln(),
        })
        .collect();
    let name = match base {
        Some(b) => format!("log{}({})", format_number(b), source.name),
        None => format!("ln({})", source.name),
    };
    let field = derive(ctx, "$log", name, FieldMode::Vec, &[source], ExtDetail::None);
    emit(ctx, field, ColumnData::Numbers(out))
}

fn log(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    log_with(ctx, args, None)
}

fn log_base(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    log_with(ctx, args, Some(num_arg(args, 1)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::num;
    use crate::operators::test_support::{call, field, out_numbers, same};

    #[test]
    fn test_normalize_mean_zero_unit_sigma() {
        let out = standardize(&[1.0, 2.0, 0.0, 100.0]);
        let mean = out.iter().sum::<f64>() / 4.0;
        let var = out.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var.sqrt() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_constant_and_non_finite() {
        assert!(same(&standardize(&[3.0, f64::NAN, 3.0]), &[0.0, f64::NAN, 0.0]));
        assert!(same(&standardize(&[f64::NAN]), &[f64::NAN]));
    }

    #[test]
    fn test_log_overloads() {
        let store = ColumnStore::new(vec![num("x", vec![1.0, 100.0])]).unwrap();
        let natural = call(&store, "$log", &[field(&store, "x")]).unwrap();
        assert_eq!(out_numbers(&store, &natural)[0], 0.0);
        let base10 = call(&store, "$log", &[field(&store, "x"), Token::Num(10.0)]).unwrap();
        let values = out_numbers(&store, &base10);
        assert!((values[1] - 2.0).abs() < 1e-12);
        assert_eq!(base10.as_field().unwrap().name, "log10(x)");
    }
}
