//! End-to-end program execution through a program store.

use latiao_common::types::{Column, ColumnData, DateExpansion, FieldId, FieldMode, FieldToken};
use latiao_common::utils::error::QueryErrorKind;
use latiao_engine::{Config, ProgramStore};
use proptest::prelude::*;

fn numbers(fid: &str, values: Vec<f64>) -> Column {
    Column {
        token: FieldToken::origin(fid, fid, FieldMode::Vec),
        data: ColumnData::Numbers(values),
    }
}

fn texts(fid: &str, values: &[&str]) -> Column {
    Column {
        token: FieldToken::origin(fid, fid, FieldMode::Text),
        data: ColumnData::Texts(values.iter().map(|s| (*s).to_string()).collect()),
    }
}

fn store() -> ProgramStore {
    ProgramStore::new(Config::default()).unwrap()
}

#[test]
fn test_clean_then_normalize() {
    let store = store();
    let id = store
        .create_program(vec![numbers("price", vec![1.0, 2.0, f64::NAN, 100.0])])
        .unwrap();

    let clean = store.execute(id, "out clean = $zeroFill(price)").unwrap();
    assert_eq!(clean[0].data.as_numbers().unwrap(), &[1.0, 2.0, 0.0, 100.0]);

    let norm = store.execute(id, "out norm = $normalize(clean)").unwrap();
    let values = norm[0].data.as_numbers().unwrap();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sigma = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    assert!(mean.abs() < 1e-12);
    assert!((sigma - 1.0).abs() < 1e-12);

    // Provenance points at the visible, public id of `clean`.
    assert_eq!(norm[0].token.ext_from(), &[clean[0].token.fid.clone()]);
}

#[test]
fn test_concat_with_separator() {
    let store = store();
    let id = store
        .create_program(vec![texts("name", &["a", "b"]), texts("city", &["x", "y"])])
        .unwrap();
    let out = store.execute(id, r#"out cat = $concat(",", name, city)"#).unwrap();
    assert_eq!(out[0].token.name, "cat");
    assert_eq!(out[0].data.as_texts().unwrap(), &["a,x".to_string(), "b,y".to_string()]);
}

#[test]
fn test_export_requirement() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0, 3.0])]).unwrap();
    let err = store.execute(id, "$normalize(x)").unwrap_err();
    assert_eq!(err.kind(), Some(QueryErrorKind::Syntax));
    let out = store.execute(id, "out y = $normalize(x)").unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].token.name, "y");
}

#[test]
fn test_exported_names_resolve_in_later_programs() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0, 3.0])]).unwrap();
    store.execute(id, "out y = $normalize(x)").unwrap();
    let out = store.execute(id, "out z = y * 2 + 1").unwrap();
    assert_eq!(out[0].data.as_numbers().unwrap(), &[-1.0, 3.0]);
}

#[test]
fn test_batch_exports_in_order() {
    let store = store();
    let id = store
        .create_program(vec![numbers("x", vec![1.0, f64::NAN, 3.0])])
        .unwrap();
    let out = store
        .execute(id, "out b = $meanFill(x), out a = $zeroFill(x), out b2 = $id(b)")
        .unwrap();
    let names: Vec<_> = out.iter().map(|c| c.token.name.as_str()).collect();
    assert_eq!(names, ["b", "a", "b2"]);
}

#[test]
fn test_date_dimensions() {
    let store = store();
    let id = store
        .create_program(vec![texts("when", &["2024-03-15", "not a date", "1970-01-01T10:30:00"])])
        .unwrap();

    let out = store.execute(id, "out d = $toDate(when).YMh").unwrap();
    let names: Vec<_> = out.iter().map(|c| c.token.name.as_str()).collect();
    assert_eq!(names, ["d.Y", "d.M", "d.h"]);
    let years = out[0].data.as_numbers().unwrap();
    assert_eq!(years[0], 2024.0);
    assert!(years[1].is_nan());
    assert_eq!(out[2].data.as_numbers().unwrap()[2], 10.0);
    assert!(matches!(out[0].token.date_expansion(), Some(DateExpansion::Dim(_))));

    let month = store.execute(id, "out $toDate(when).YM.M").unwrap();
    assert_eq!(month[0].data.as_numbers().unwrap()[0], 3.0);

    for bad in ["out $toDate(when).YY", "out $toDate(when).YM.D", "out $toDate(when).Q"] {
        assert_eq!(store.execute(id, bad).unwrap_err().kind(), Some(QueryErrorKind::Type), "{bad}");
    }
}

#[test]
fn test_pointwise_operators() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();
    let out = store
        .execute(id, "out sq = $map(x, 'd * d'), out big = $test(x, 'd > 2'), out p = $partition(x, 'i % 2 == 0')")
        .unwrap();
    assert_eq!(out[0].data.as_numbers().unwrap(), &[1.0, 4.0, 9.0, 16.0]);
    assert_eq!(out[1].data.as_numbers().unwrap(), &[0.0, 0.0, 1.0, 1.0]);
    assert_eq!(out[1].token.mode, FieldMode::Bool);
    assert_eq!(out[2].token.name, "p.1");
    assert_eq!(out[3].token.name, "p.2");
}

#[test]
fn test_failure_keeps_committed_writes() {
    let store = store();
    let id = store.create_program(vec![texts("t", &["a", "b"])]).unwrap();
    let err = store
        .execute(id, "out ok = $replace(t, 'a', 'z'), out bad = $match(t, '(')")
        .unwrap_err();
    assert_eq!(err.kind(), Some(QueryErrorKind::Runtime));
    assert!(err.location().is_some());

    let program = store.program(id).unwrap();
    assert_eq!(program.store().derived_count(), 1);
    // The committed column was exported before the failure and stays visible.
    let out = store.execute(id, "out $id(ok)").unwrap();
    assert_eq!(out[0].data.as_texts().unwrap(), &["z".to_string(), "b".to_string()]);
}

#[test]
fn test_error_locations() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0])]).unwrap();
    let err = store.execute(id, "out y =\n  $normalize(missing)").unwrap_err();
    assert_eq!(err.kind(), Some(QueryErrorKind::Name));
    let loc = err.location().unwrap();
    assert_eq!((loc.start, loc.end), ((2, 13), (2, 20)));
    assert!(err.to_string().ends_with("at [[2, 13], [2, 20]]"));
}

#[test]
fn test_public_ids_round_trip() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0, 2.0])]).unwrap();
    let out = store.execute(id, "out $log(x)").unwrap();
    let public = &out[0].token.fid;
    assert!(!public.is_derived());
    let again = store.execute(id, &format!("out $id(`{public}`)")).unwrap();
    assert_eq!(again[0].token.ext_from(), &[public.clone()]);
    assert_ne!(again[0].token.fid, FieldId::new("x"));
}

#[test]
fn test_long_arithmetic_chains_fail_cleanly() {
    let store = store();
    let id = store.create_program(vec![numbers("x", vec![1.0, 2.0])]).unwrap();

    let chain = vec!["x"; 20_000].join("+");
    let err = store.execute(id, &format!("out {chain}")).unwrap_err();
    assert_eq!(err.kind(), Some(QueryErrorKind::Syntax));
    assert!(err.location().is_some());

    let sum = vec!["d"; 20_000].join("+");
    let err = store.execute(id, &format!("out $map(x, '{sum}')")).unwrap_err();
    assert_eq!(err.kind(), Some(QueryErrorKind::Runtime));

    // The program is still usable, and moderate chains run.
    let out = store.execute(id, &format!("out {}", vec!["x"; 100].join(" + "))).unwrap();
    assert_eq!(out[0].data.as_numbers().unwrap(), &[100.0, 200.0]);
}

#[test]
fn test_zero_row_programs() {
    let store = store();
    let id = store
        .create_program(vec![
            Column {
                token: FieldToken::origin("city", "city", FieldMode::Text),
                data: ColumnData::Numbers(vec![]),
            },
            numbers("x", vec![]),
        ])
        .unwrap();
    let out = store
        .execute(
            id,
            "out $concat(city, city), out $replace(city, 'a', 'b'), out $normalize(x), out $map(city, 'd')",
        )
        .unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].data.as_texts(), Some(&[][..]));
    assert!(out.iter().all(|c| c.data.is_empty()));
}

proptest! {
    #[test]
    fn prop_zero_fill_has_no_nan(values in prop::collection::vec(prop_oneof![Just(f64::NAN), -1e6f64..1e6], 1..40)) {
        let store = store();
        let id = store.create_program(vec![numbers("x", values.clone())]).unwrap();
        let out = store.execute(id, "out $zeroFill(x)").unwrap();
        let filled = out[0].data.as_numbers().unwrap();
        for (before, after) in values.iter().zip(filled) {
            if before.is_nan() {
                prop_assert_eq!(*after, 0.0);
            } else {
                prop_assert_eq!(after, before);
            }
        }
    }
}
