//! Row-wise operators driven by a user expression.

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, FieldToken, Token};
use latiao_common::utils::error::Result;

use super::{BOOL, FIELDS, SET, STR, TEXT, VEC, derive, emit, field_arg, str_arg};
use crate::context::ExecutionContext;
use crate::eval::{CompiledExpression, Value};
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    for ty in [VEC, SET, TEXT] {
        registry.register(Operator::new("$map", &[ty, STR], ty, map))?;
        registry.register(Operator::new("$partition", &[ty, STR], FIELDS, partition))?;
    }
    for ty in [VEC, SET, TEXT, BOOL] {
        registry.register(Operator::new("$test", &[ty, STR], BOOL, test))?;
    }
    Ok(())
}

/// Evaluator input for every row of `data`.
fn row_values(mode: FieldMode, data: &ColumnData) -> Vec<Value> {
    match data {
        ColumnData::Texts(v) => v.iter().map(|s| Value::Str(s.clone())).collect(),
        ColumnData::Numbers(v) if mode == FieldMode::Bool => {
            v.iter().map(|&x| Value::Bool(x != 0.0 && !x.is_nan())).collect()
        }
        ColumnData::Numbers(v) => v.iter().map(|&x| Value::Num(x)).collect(),
    }
}

fn eval_rows(compiled: &dyn CompiledExpression, rows: &[Value]) -> Result<Vec<Value>> {
    rows.iter().enumerate().map(|(i, d)| compiled.eval(d, i)).collect()
}

/// Compiles the predicate and reports which rows satisfy it.
fn truth(ctx: &dyn ExecutionContext, source: &FieldToken, expr: &str) -> Result<(ColumnData, Vec<bool>)> {
    let compiled = ctx.evaluator().compile(expr)?;
    let data = ctx.col(source)?;
    let rows = row_values(source.mode, &data);
    let mask = eval_rows(compiled.as_ref(), &rows)?
        .iter()
        .map(Value::is_truthy)
        .collect();
    Ok(((*data).clone(), mask))
}

fn map(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let expr = str_arg(args, 1)?;
    let compiled = ctx.evaluator().compile(expr)?;
    let data = ctx.col(source)?;
    let results = eval_rows(compiled.as_ref(), &row_values(source.mode, &data))?;

    // Results of the wrong primitive type become the mode's empty value.
    let out = if source.mode.is_text() {
        ColumnData::Texts(
            results
                .into_iter()
                .map(|v| match v {
                    Value::Str(s) => s,
                    _ => String::new(),
                })
                .collect(),
        )
    } else {
        ColumnData::Numbers(
            results
                .into_iter()
                .map(|v| match v {
                    Value::Num(n) => n,
                    _ => f64::NAN,
                })
                .collect(),
        )
    };

    let field = derive(
        ctx,
        "$map",
        format!("{} mapped by {expr}", source.name),
        source.mode,
        &[source],
        ExtDetail::Text(expr.to_string()),
    );
    emit(ctx, field, out)
}

fn test(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let expr = str_arg(args, 1)?;
    let (_, mask) = truth(ctx, source, expr)?;
    let out = mask.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect();
    let field = derive(
        ctx,
        "$test",
        format!("{} test {expr}", source.name),
        FieldMode::Bool,
        &[source],
        ExtDetail::Text(expr.to_string()),
    );
    emit(ctx, field, ColumnData::Numbers(out))
}

/// Keeps rows where `keep` matches the mask, blanking the rest.
fn select(data: &ColumnData, mask: &[bool], keep: bool) -> ColumnData {
    match data {
        ColumnData::Numbers(v) => ColumnData::Numbers(
            v.iter()
                .zip(mask)
                .map(|(&x, &m)| if m == keep { x } else { f64::NAN })
                .collect(),
        ),
        ColumnData::Texts(v) => ColumnData::Texts(
            v.iter()
                .zip(mask)
                .map(|(s, &m)| if m == keep { s.clone() } else { String::new() })
                .collect(),
        ),
    }
}

fn partition(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let expr = str_arg(args, 1)?;
    let (data, mask) = truth(ctx, source, expr)?;

    let mut fields = Vec::with_capacity(2);
    for (keep, name) in [
        (true, format!("{} where {expr}", source.name)),
        (false, format!("{} where not {expr}", source.name)),
    ] {
        let field = derive(ctx, "$partition", name, source.mode, &[source], ExtDetail::Text(expr.to_string()));
        ctx.write(field.clone(), select(&data, &mask, keep))?;
        fields.push(field);
    }
    Ok(Token::FieldList(fields))
}

#[cfg(test)]
mod tests {
    use latiao_common::utils::error::QueryErrorKind;

    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::{num, text};
    use crate::operators::test_support::{call, field, out_numbers, out_texts, same};

    fn expr(s: &str) -> Token {
        Token::Str(s.to_string())
    }

    #[test]
    fn test_map_numeric() {
        let store = ColumnStore::new(vec![num("a", vec![1.0, 2.0, f64::NAN])]).unwrap();
        let out = call(&store, "$map", &[field(&store, "a"), expr("d * 10 + i")]).unwrap();
        assert!(same(&out_numbers(&store, &out), &[10.0, 21.0, f64::NAN]));
        assert_eq!(out.as_field().unwrap().mode, FieldMode::Vec);

        // strings are not numbers
        let out = call(&store, "$map", &[field(&store, "a"), expr("'x'")]).unwrap();
        assert!(out_numbers(&store, &out).iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_map_text() {
        let store = ColumnStore::new(vec![text("t", &["ab", "c"])]).unwrap();
        let out = call(&store, "$map", &[field(&store, "t"), expr("d.toUpperCase() + i")]).unwrap();
        assert_eq!(out_texts(&store, &out), vec!["AB0", "C1"]);
        let out = call(&store, "$map", &[field(&store, "t"), expr("d.length")]).unwrap();
        assert_eq!(out_texts(&store, &out), vec!["", ""]);
    }

    #[test]
    fn test_test_uses_truthiness() {
        let store = ColumnStore::new(vec![num("a", vec![0.0, 3.0, f64::NAN, -1.0])]).unwrap();
        let out = call(&store, "$test", &[field(&store, "a"), expr("d")]).unwrap();
        assert_eq!(out_numbers(&store, &out), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(out.as_field().unwrap().mode, FieldMode::Bool);
    }

    #[test]
    fn test_partition_splits_rows() {
        let store = ColumnStore::new(vec![num("a", vec![1.0, 5.0, 2.0]), text("t", &["x", "yy"])]).unwrap();
        let out = call(&store, "$partition", &[field(&store, "a"), expr("d > 1")]).unwrap();
        let Token::FieldList(parts) = &out else { panic!("expected a field list") };
        assert_eq!(parts[0].name, "a where d > 1");
        assert_eq!(parts[1].name, "a where not d > 1");
        let yes = out_numbers(&store, &Token::Field(parts[0].clone()));
        let no = out_numbers(&store, &Token::Field(parts[1].clone()));
        assert!(same(&yes, &[f64::NAN, 5.0, 2.0]));
        assert!(same(&no, &[1.0, f64::NAN, f64::NAN]));
        assert_eq!(parts[0].ext_from()[0].as_str(), "a");
    }

    #[test]
    fn test_partition_text_blanks() {
        let store = ColumnStore::new(vec![text("t", &["x", "yy"])]).unwrap();
        let out = call(&store, "$partition", &[field(&store, "t"), expr("d.length > 1")]).unwrap();
        let Token::FieldList(parts) = &out else { panic!("expected a field list") };
        assert_eq!(out_texts(&store, &Token::Field(parts[0].clone())), vec!["", "yy"]);
        assert_eq!(out_texts(&store, &Token::Field(parts[1].clone())), vec!["x", ""]);
    }

    #[test]
    fn test_bad_expression_is_runtime_error() {
        let store = ColumnStore::new(vec![num("a", vec![1.0])]).unwrap();
        let err = call(&store, "$test", &[field(&store, "a"), expr("d +")]).unwrap_err();
        assert_eq!(err.kind(), Some(QueryErrorKind::Runtime));
        assert_eq!(store.derived_count(), 0);
    }
}
