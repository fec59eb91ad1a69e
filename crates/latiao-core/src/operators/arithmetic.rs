//! Desugared binary arithmetic.
//!
//! `a + b` in program text becomes `$__add(a, b)` and so on. Scalars
//! broadcast over the row count, so every overload yields a full column.

use std::sync::Arc;

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, FieldToken, Token};
use latiao_common::utils::error::{Error, Result};

use super::{NUM, VEC, derive, emit, numbers};
use crate::coerce::format_number;
use crate::context::ExecutionContext;
use crate::registry::{ExecFn, Operator, OperatorRegistry};

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Minus,
    Multiply,
    Divide,
}

impl Arith {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    const fn op(self) -> &'static str {
        match self {
            Self::Add => "$add",
            Self::Minus => "$minus",
            Self::Multiply => "$multiply",
            Self::Divide => "$divide",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Minus => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }
}

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    let table: [(&'static str, ExecFn); 4] = [
        ("$__add", add),
        ("$__minus", minus),
        ("$__multiply", multiply),
        ("$__divide", divide),
    ];
    for (name, exec) in table {
        for sig in [[VEC, VEC], [VEC, NUM], [NUM, VEC], [NUM, NUM]] {
            registry.register(Operator::new(name, &sig, VEC, exec))?;
        }
    }
    Ok(())
}

fn add(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    binary(ctx, args, Arith::Add)
}

fn minus(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    binary(ctx, args, Arith::Minus)
}

fn multiply(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    binary(ctx, args, Arith::Multiply)
}

fn divide(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    binary(ctx, args, Arith::Divide)
}

/// One side of a binary operation.
enum Operand<'a> {
    Column(&'a FieldToken, Arc<ColumnData>),
    Scalar(f64),
}

impl Operand<'_> {
    fn label(&self) -> String {
        match self {
            Self::Column(field, _) if field.name.is_empty() => field.fid.to_string(),
            Self::Column(field, _) => field.name.clone(),
            Self::Scalar(x) => format_number(*x),
        }
    }

    fn at(&self, i: usize) -> Result<f64> {
        match self {
            Self::Column(_, data) => Ok(numbers(data)?.get(i).copied().unwrap_or(f64::NAN)),
            Self::Scalar(x) => Ok(*x),
        }
    }
}

fn operand<'a>(ctx: &dyn ExecutionContext, token: Option<&'a Token>) -> Result<Operand<'a>> {
    match token {
        Some(Token::Num(x)) => Ok(Operand::Scalar(*x)),
        Some(Token::Field(field)) => Ok(Operand::Column(field, ctx.col(field)?)),
        _ => Err(Error::Internal("arithmetic operand is neither a number nor a field".to_string())),
    }
}

fn binary(ctx: &dyn ExecutionContext, args: &[Token], arith: Arith) -> Result<Token> {
    let a = operand(ctx, args.first())?;
    let b = operand(ctx, args.get(1))?;

    let out = (0..ctx.row_count())
        .map(|i| Ok(arith.apply(a.at(i)?, b.at(i)?)))
        .collect::<Result<Vec<f64>>>()?;

    let sources: Vec<&FieldToken> = [&a, &b]
        .into_iter()
        .filter_map(|o| match o {
            Operand::Column(field, _) => Some(*field),
            Operand::Scalar(_) => None,
        })
        .collect();
    let name = format!("{} {} {}", a.label(), arith.symbol(), b.label());
    let field = derive(ctx, arith.op(), name, FieldMode::Vec, &sources, ExtDetail::None);
    emit(ctx, field, ColumnData::Numbers(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::num;
    use crate::operators::test_support::{call, field, out_numbers};

    fn store() -> ColumnStore {
        ColumnStore::new(vec![num("a", vec![1.0, 2.0, 3.0]), num("b", vec![4.0, 5.0, 0.0])]).unwrap()
    }

    #[test]
    fn test_column_pairs() {
        let store = store();
        let (a, b) = (field(&store, "a"), field(&store, "b"));
        let sum = call(&store, "$__add", &[a.clone(), b.clone()]).unwrap();
        assert_eq!(out_numbers(&store, &sum), vec![5.0, 7.0, 3.0]);
        assert_eq!(sum.as_field().unwrap().name, "a + b");
        assert_eq!(sum.as_field().unwrap().ext_from().len(), 2);

        let ratio = call(&store, "$__divide", &[a, b]).unwrap();
        assert_eq!(out_numbers(&store, &ratio)[2], f64::INFINITY);
        assert_eq!(ratio.as_field().unwrap().ext_info.as_ref().unwrap().ext_op, "LaTiao.$divide");
    }

    #[test]
    fn test_scalar_order_matters() {
        let store = store();
        let a = field(&store, "a");
        let left = call(&store, "$__minus", &[Token::Num(10.0), a.clone()]).unwrap();
        assert_eq!(out_numbers(&store, &left), vec![9.0, 8.0, 7.0]);
        let right = call(&store, "$__minus", &[a.clone(), Token::Num(10.0)]).unwrap();
        assert_eq!(out_numbers(&store, &right), vec![-9.0, -8.0, -7.0]);
        let div = call(&store, "$__divide", &[Token::Num(6.0), a]).unwrap();
        assert_eq!(out_numbers(&store, &div), vec![6.0, 3.0, 2.0]);
    }

    #[test]
    fn test_scalar_pair_broadcasts() {
        let store = store();
        let out = call(&store, "$__multiply", &[Token::Num(2.0), Token::Num(1.5)]).unwrap();
        assert_eq!(out_numbers(&store, &out), vec![3.0; 3]);
        let field = out.as_field().unwrap();
        assert_eq!(field.name, "2 * 1.5");
        assert!(field.ext_from().is_empty());
        assert!(!field.out);
    }
}
