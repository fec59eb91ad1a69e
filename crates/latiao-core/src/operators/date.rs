//! Date parsing and calendar projections.
//!
//! `$toDate` linearizes a column into epoch milliseconds and returns a date
//! handle. Member access on the handle lowers to `$__projDate` (one
//! dimension) or `$__sliceDate` (several), which read UTC calendar fields.

use chrono::{DateTime, Datelike, Timelike};
use latiao_common::types::{
    ColumnData, DateDimension, DateDimensions, DateExpansion, DateToken, ExtDetail, ExtInfo,
    FieldMode, FieldToken, Token,
};
use latiao_common::utils::error::{Error, Result};

use super::{BOOL, DATE, FIELDS, SET, STR, TEXT, VEC, date_arg, emit, field_arg, numbers, str_arg};
use crate::context::ExecutionContext;
use crate::lineage::resolve_dependencies;
use crate::registry::{Operator, OperatorRegistry};

const EXPAND: &str = "dateTimeExpand";

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    for ty in [SET, VEC, TEXT] {
        registry.register(Operator::new("$toDate", &[ty], DATE, to_date))?;
    }
    registry.register(Operator::new("$toDate", &[DATE], DATE, rewrap))?;
    registry.register(Operator::new("$isValidDate", &[DATE], BOOL, is_valid_date))?;
    registry.register(Operator::new("$__projDate", &[DATE, STR], VEC, project_date))?;
    registry.register(Operator::new("$__sliceDate", &[DATE, STR], FIELDS, slice_date))?;
    Ok(())
}

/// Reads one UTC calendar field of an epoch-millisecond timestamp.
///
/// Month is 1-based and Sunday is weekday 0. Non-finite or out-of-range
/// timestamps give NaN.
#[must_use]
pub fn project(ms: f64, dim: DateDimension) -> f64 {
    if !ms.is_finite() {
        return f64::NAN;
    }
    let Some(t) = DateTime::from_timestamp_millis(ms.floor() as i64) else {
        return f64::NAN;
    };
    let v = match dim {
        DateDimension::Year => i64::from(t.year()),
        DateDimension::Month => i64::from(t.month()),
        DateDimension::Weekday => i64::from(t.weekday().num_days_from_sunday()),
        DateDimension::Day => i64::from(t.day()),
        DateDimension::Hour => i64::from(t.hour()),
        DateDimension::Minute => i64::from(t.minute()),
        DateDimension::Second => i64::from(t.second()),
    };
    v as f64
}

fn to_date(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let data = ctx.col(source)?;
    let parser = ctx.date_parser();
    let utime = match &*data {
        ColumnData::Numbers(v) => v.clone(),
        ColumnData::Texts(v) => v.iter().map(|s| parser.parse(s).unwrap_or(f64::NAN)).collect(),
    };

    let ext = ExtInfo::new(EXPAND, resolve_dependencies(&[source.fid.clone()], ctx))
        .with_detail(ExtDetail::Date(DateExpansion::Utime));
    let field = FieldToken::derived(format!("DateTime ({})", source.name), FieldMode::Vec, ext);
    ctx.write(field.clone(), ColumnData::Numbers(utime))?;

    Ok(Token::Date(DateToken {
        source: field,
        dims: DateDimensions::ALL,
    }))
}

fn rewrap(_ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let date = date_arg(args, 0)?;
    Ok(Token::Date(DateToken {
        source: date.source.clone(),
        dims: DateDimensions::ALL,
    }))
}

fn is_valid_date(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let date = date_arg(args, 0)?;
    let data = ctx.col(&date.source)?;
    let out = numbers(&data)?
        .iter()
        .map(|&x| if x.is_finite() && x >= 0.0 { 1.0 } else { 0.0 })
        .collect();
    let ext = ExtInfo::new("LaTiao.$isValidDate", resolve_dependencies(&[date.source.fid.clone()], ctx));
    let field = FieldToken::derived(format!("{} is valid date", date.source.name), FieldMode::Bool, ext);
    emit(ctx, field, ColumnData::Numbers(out))
}

/// Validates a slice key against what the handle still exposes.
fn dimensions(date: &DateToken, key: &str) -> Result<Vec<DateDimension>> {
    let dims = DateDimension::parse_key(key)?;
    if let Some(missing) = dims.iter().find(|d| !date.dims.contains(**d)) {
        return Err(Error::type_error(format!(
            "Dimension \"{missing}\" is not available on this date, available: \"{}\".",
            date.dims
        )));
    }
    Ok(dims.into_vec())
}

fn write_projection(ctx: &dyn ExecutionContext, date: &DateToken, utime: &[f64], dim: DateDimension) -> Result<FieldToken> {
    let ext = ExtInfo::new(EXPAND, resolve_dependencies(&[date.source.fid.clone()], ctx))
        .with_detail(ExtDetail::Date(DateExpansion::Dim(dim)));
    let field = FieldToken::derived(format!("{}.{dim}", date.source.name), FieldMode::Vec, ext);
    let data = utime.iter().map(|&ms| project(ms, dim)).collect();
    ctx.write(field.clone(), ColumnData::Numbers(data))?;
    Ok(field)
}

fn project_date(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let date = date_arg(args, 0)?;
    let dims = dimensions(date, str_arg(args, 1)?)?;
    let [dim] = dims.as_slice() else {
        return Err(Error::type_error("A projection takes exactly one dimension."));
    };
    let data = ctx.col(&date.source)?;
    let field = write_projection(ctx, date, numbers(&data)?, *dim)?;
    Ok(Token::Field(field))
}

fn slice_date(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let date = date_arg(args, 0)?;
    let dims = dimensions(date, str_arg(args, 1)?)?;
    let data = ctx.col(&date.source)?;
    let utime = numbers(&data)?;
    let fields = dims
        .into_iter()
        .map(|dim| write_projection(ctx, date, utime, dim))
        .collect::<Result<Vec<_>>>()?;
    Ok(Token::FieldList(fields))
}

#[cfg(test)]
mod tests {
    use latiao_common::utils::error::QueryErrorKind;

    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::{num, text};
    use crate::operators::test_support::{call, field, out_numbers, same};

    // 2024-03-10T15:04:05Z, a Sunday
    const MS: f64 = 1_710_083_045_000.0;

    #[test]
    fn test_projection_fields() {
        assert_eq!(project(MS, DateDimension::Year), 2024.0);
        assert_eq!(project(MS, DateDimension::Month), 3.0);
        assert_eq!(project(MS, DateDimension::Weekday), 0.0);
        assert_eq!(project(MS, DateDimension::Day), 10.0);
        assert_eq!(project(MS, DateDimension::Hour), 15.0);
        assert_eq!(project(MS, DateDimension::Minute), 4.0);
        assert_eq!(project(MS, DateDimension::Second), 5.0);
        assert!(project(f64::NAN, DateDimension::Year).is_nan());
    }

    #[test]
    fn test_to_date_and_slice() {
        let store = ColumnStore::new(vec![text("t", &["2024-03-10", "bad"])]).unwrap();
        let date = call(&store, "$toDate", &[field(&store, "t")]).unwrap();
        let handle = date.as_date().unwrap();
        assert_eq!(handle.dims, DateDimensions::ALL);
        assert_eq!(handle.source.date_expansion(), Some(DateExpansion::Utime));

        let slice = call(&store, "$__sliceDate", &[date.clone(), Token::Str("MY".into())]).unwrap();
        let Token::FieldList(fields) = &slice else { panic!("expected a field list") };
        assert_eq!(fields.len(), 2);
        let month = out_numbers(&store, &Token::Field(fields[0].clone()));
        assert!(same(&month, &[3.0, f64::NAN]));
        assert_eq!(fields[1].date_expansion(), Some(DateExpansion::Dim(DateDimension::Year)));
        assert_eq!(fields[1].ext_from()[0].as_str(), "t");

        let valid = call(&store, "$isValidDate", &[date]).unwrap();
        assert_eq!(out_numbers(&store, &valid), vec![1.0, 0.0]);
    }

    #[test]
    fn test_dimension_gating() {
        let store = ColumnStore::new(vec![num("t", vec![MS])]).unwrap();
        let Token::Date(mut handle) = call(&store, "$toDate", &[field(&store, "t")]).unwrap() else {
            panic!("expected a date")
        };
        handle.dims = DateDimension::parse_key("YM").unwrap().into_iter().collect();
        let date = Token::Date(handle);

        assert!(call(&store, "$__sliceDate", &[date.clone(), Token::Str("YM".into())]).is_ok());
        for key in ["YY", "D", "H"] {
            let err = call(&store, "$__sliceDate", &[date.clone(), Token::Str(key.into())]).unwrap_err();
            assert_eq!(err.kind(), Some(QueryErrorKind::Type), "{key}");
        }
        let year = call(&store, "$__projDate", &[date, Token::Str("Y".into())]).unwrap();
        assert_eq!(out_numbers(&store, &year), vec![2024.0]);
    }
}
