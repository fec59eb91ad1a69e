//! Row predicates producing bool columns.

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, Token};
use latiao_common::utils::error::Result;

use super::{BOOL, SET, VEC, derive, emit, field_arg, numbers, read_numbers};
use crate::context::ExecutionContext;
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    for ty in [VEC, SET] {
        registry.register(Operator::new("$isNaN", &[ty], BOOL, is_nan))?;
        registry.register(Operator::new("$isZero", &[ty], BOOL, is_zero))?;
    }
    Ok(())
}

fn predicate(
    ctx: &dyn ExecutionContext,
    args: &[Token],
    op: &str,
    label: &str,
    test: fn(f64) -> bool,
) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = read_numbers(ctx, source)?;
    let out = numbers(&data)?.iter().map(|&x| if test(x) { 1.0 } else { 0.0 }).collect();
    let field = derive(
        ctx,
        op,
        format!("{} {label}", source.name),
        FieldMode::Bool,
        &[source],
        ExtDetail::None,
    );
    emit(ctx, field, ColumnData::Numbers(out))
}

fn is_nan(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    predicate(ctx, args, "$isNaN", "is NaN", f64::is_nan)
}

fn is_zero(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    predicate(ctx, args, "$isZero", "is zero", |x| x == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::{num, set};
    use crate::operators::test_support::{call, field, out_numbers};

    #[test]
    fn test_predicates() {
        let store = ColumnStore::new(vec![
            num("v", vec![0.0, f64::NAN, 2.0]),
            set("s", vec![0.0, 1.0, 0.0]),
        ])
        .unwrap();
        let nan = call(&store, "$isNaN", &[field(&store, "v")]).unwrap();
        assert_eq!(out_numbers(&store, &nan), vec![0.0, 1.0, 0.0]);
        assert_eq!(nan.as_field().unwrap().mode, FieldMode::Bool);
        let zero = call(&store, "$isZero", &[field(&store, "s")]).unwrap();
        assert_eq!(out_numbers(&store, &zero), vec![1.0, 0.0, 1.0]);
    }
}
