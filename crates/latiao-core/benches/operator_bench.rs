use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use latiao_common::types::{Column, ColumnData, FieldMode, FieldToken, Token, TokenType};
use latiao_core::{ColumnStore, DateParser, OperatorRegistry, ProgramContext, SandboxEvaluator};

const ROWS: usize = 10_000;

struct NoDates;

impl DateParser for NoDates {
    fn parse(&self, _text: &str) -> Option<f64> {
        None
    }
}

fn make_columns() -> Vec<Column> {
    let values = (0..ROWS).map(|i| ((i * 37) % 1000) as f64 / 10.0).collect();
    let labels = (0..ROWS).map(|i| format!("label-{}", i % 50)).collect();
    vec![
        Column {
            token: FieldToken::origin("v", "value", FieldMode::Vec),
            data: ColumnData::Numbers(values),
        },
        Column {
            token: FieldToken::origin("t", "label", FieldMode::Text),
            data: ColumnData::Texts(labels),
        },
    ]
}

fn bench_operator(c: &mut Criterion, registry: &OperatorRegistry, op: &str, fid: &str, extra: &[Token]) {
    let columns = make_columns();
    let evaluator = SandboxEvaluator::default();
    c.bench_function(&format!("{op}/{fid}"), |b| {
        b.iter_batched(
            || ColumnStore::new(columns.clone()).unwrap(),
            |store| {
                let mut args = vec![Token::Field(store.field(fid).unwrap())];
                args.extend_from_slice(extra);
                let types: Vec<TokenType> = args.iter().map(Token::token_type).collect();
                let (_, operator) = registry.resolve(op, &types).unwrap();
                let ctx = ProgramContext::new(&store, &NoDates, &evaluator);
                black_box((operator.exec)(&ctx, &args).unwrap());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_operators(c: &mut Criterion) {
    let registry = OperatorRegistry::with_builtins().unwrap();
    bench_operator(c, &registry, "$normalize", "v", &[]);
    bench_operator(c, &registry, "$boxClip", "v", &[]);
    bench_operator(c, &registry, "$order", "t", &[]);
    bench_operator(c, &registry, "$map", "v", &[Token::Str("d * 2 + 1".into())]);
    bench_operator(c, &registry, "$replace", "t", &[Token::Str("(\\d+)".into()), Token::Str("#$1".into())]);
}

criterion_group!(benches, bench_operators);
criterion_main!(benches);
