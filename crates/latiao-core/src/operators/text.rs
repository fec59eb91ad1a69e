//! Text operators: concatenation and regular expressions.

use latiao_common::types::{ColumnData, ExtDetail, FieldMode, FieldToken, Token};
use latiao_common::utils::error::{Error, Result};
use regex::{Captures, Regex};

use super::{STR, TEXT, derive, emit, field_arg, str_arg, texts};
use crate::context::ExecutionContext;
use crate::registry::{Operator, OperatorRegistry};

pub(super) fn register(registry: &mut OperatorRegistry) -> Result<()> {
    registry.register(Operator::new("$concat", &[], TEXT, concat).with_trailing(TEXT))?;
    registry.register(Operator::new("$concat", &[STR], TEXT, concat_with).with_trailing(TEXT))?;
    registry.register(Operator::new("$match", &[TEXT, STR], TEXT, match_first))?;
    registry.register(Operator::new("$replace", &[TEXT, STR, STR], TEXT, replace))?;
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::runtime(format!("Invalid regular expression /{pattern}/: {e}")))
}

fn join(ctx: &dyn ExecutionContext, sep: &str, args: &[Token]) -> Result<Token> {
    let sources = args
        .iter()
        .map(|a| a.as_field().ok_or_else(|| Error::Internal("$concat takes text fields".into())))
        .collect::<Result<Vec<&FieldToken>>>()?;
    let columns = sources
        .iter()
        .map(|f| ctx.col(f))
        .collect::<Result<Vec<_>>>()?;
    let columns = columns.iter().map(|c| texts(c)).collect::<Result<Vec<_>>>()?;

    let out = (0..ctx.row_count())
        .map(|row| {
            columns
                .iter()
                .map(|c| c[row].as_str())
                .collect::<Vec<_>>()
                .join(sep)
        })
        .collect();
    let name = sources.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(sep);
    let field = derive(ctx, "$concat", name, FieldMode::Text, &sources, ExtDetail::None);
    emit(ctx, field, ColumnData::Texts(out))
}

fn concat(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let sep = ctx.separator().to_string();
    join(ctx, &sep, args)
}

fn concat_with(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let sep = str_arg(args, 0)?;
    join(ctx, sep, &args[1..])
}

fn match_first(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let pattern = str_arg(args, 1)?;
    let re = compile(pattern)?;
    let data = ctx.col(source)?;
    let out = texts(&data)?
        .iter()
        .map(|s| re.find(s).map_or_else(String::new, |m| m.as_str().to_string()))
        .collect();
    let field = derive(
        ctx,
        "$match",
        format!("{} match /{pattern}/", source.name),
        FieldMode::Text,
        &[source],
        ExtDetail::Text(pattern.to_string()),
    );
    emit(ctx, field, ColumnData::Texts(out))
}

/// Global replace. The replacement uses the host's template syntax:
/// `$n`/`$nn`, `$<name>`, `$&`, `` $` ``, `$'` and `$$`.
fn replace(ctx: &dyn ExecutionContext, args: &[Token]) -> Result<Token> {
    let source = field_arg(args, 0)?;
    let pattern = str_arg(args, 1)?;
    let re = compile(pattern)?;
    let template = Template::parse(str_arg(args, 2)?, &re);
    let data = ctx.col(source)?;
    let out = texts(&data)?
        .iter()
        .map(|s| re.replace_all(s, |caps: &Captures<'_>| template.expand(caps, s)).into_owned())
        .collect();
    let field = derive(
        ctx,
        "$replace",
        format!("{} replace /{pattern}/", source.name),
        FieldMode::Text,
        &[source],
        ExtDetail::Text(pattern.to_string()),
    );
    emit(ctx, field, ColumnData::Texts(out))
}

#[derive(Debug, PartialEq)]
enum Piece {
    Text(String),
    Group(usize),
    Named(String),
    Before,
    After,
}

/// A replacement template resolved against one regex.
#[derive(Debug, PartialEq)]
struct Template(Vec<Piece>);

impl Template {
    fn parse(template: &str, re: &Regex) -> Self {
        let groups = re.captures_len() - 1;
        let named = re.capture_names().flatten().next().is_some();
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut rest = template;

        while let Some(at) = rest.find('$') {
            text.push_str(&rest[..at]);
            let tail = &rest[at + 1..];
            let (piece, used) = match tail.as_bytes().first() {
                Some(b'$') => (Some(Piece::Text("$".into())), 1),
                Some(b'&') => (Some(Piece::Group(0)), 1),
                Some(b'`') => (Some(Piece::Before), 1),
                Some(b'\'') => (Some(Piece::After), 1),
                Some(b'<') if named => match tail.find('>') {
                    Some(end) => (Some(Piece::Named(tail[1..end].to_string())), end + 1),
                    None => (None, 0),
                },
                Some(c) if c.is_ascii_digit() => group_ref(tail, groups),
                _ => (None, 0),
            };
            match piece {
                Some(Piece::Text(t)) => text.push_str(&t),
                Some(piece) => {
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(piece);
                }
                None => text.push('$'),
            }
            rest = &tail[used..];
        }
        text.push_str(rest);
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Self(pieces)
    }

    fn expand(&self, caps: &Captures<'_>, haystack: &str) -> String {
        let Some(whole) = caps.get(0) else {
            return String::new();
        };
        let mut out = String::new();
        for piece in &self.0 {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Group(n) => out.push_str(caps.get(*n).map_or("", |m| m.as_str())),
                Piece::Named(name) => out.push_str(caps.name(name).map_or("", |m| m.as_str())),
                Piece::Before => out.push_str(&haystack[..whole.start()]),
                Piece::After => out.push_str(&haystack[whole.end()..]),
            }
        }
        out
    }
}

/// Reads `$n` or `$nn` after the `$`. Two digits win when they name an
/// existing group; references to missing groups stay literal.
fn group_ref(tail: &str, groups: usize) -> (Option<Piece>, usize) {
    let digit = |i: usize| tail.as_bytes().get(i).filter(|c| c.is_ascii_digit()).map(|c| usize::from(c - b'0'));
    if let (Some(a), Some(b)) = (digit(0), digit(1)) {
        let n = a * 10 + b;
        if (1..=groups).contains(&n) {
            return (Some(Piece::Group(n)), 2);
        }
    }
    match digit(0) {
        Some(n) if (1..=groups).contains(&n) => (Some(Piece::Group(n)), 1),
        _ => (None, 0),
    }
}

#[cfg(test)]
mod tests {
    use latiao_common::utils::error::QueryErrorKind;

    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::text;
    use crate::operators::test_support::{call, field, out_texts};

    fn store() -> ColumnStore {
        ColumnStore::new(vec![text("name", &["a", "b"]), text("city", &["x", "y"])]).unwrap()
    }

    #[test]
    fn test_concat_with_separator() {
        let store = store();
        let args = [Token::Str(",".into()), field(&store, "name"), field(&store, "city")];
        let out = call(&store, "$concat", &args).unwrap();
        assert_eq!(out_texts(&store, &out), vec!["a,x", "b,y"]);
        assert_eq!(out.as_field().unwrap().name, "name,city");
        assert_eq!(out.as_field().unwrap().ext_from().len(), 2);
    }

    #[test]
    fn test_concat_default_separator() {
        let store = store();
        let out = call(&store, "$concat", &[field(&store, "city"), field(&store, "name")]).unwrap();
        assert_eq!(out_texts(&store, &out), vec!["x,a", "y,b"]);
    }

    #[test]
    fn test_match_and_replace() {
        let store = ColumnStore::new(vec![text("s", &["ab12cd", "none", "7-8"])]).unwrap();
        let m = call(&store, "$match", &[field(&store, "s"), Token::Str(r"\d+".into())]).unwrap();
        assert_eq!(out_texts(&store, &m), vec!["12", "", "7"]);

        let r = call(
            &store,
            "$replace",
            &[field(&store, "s"), Token::Str(r"(\d)".into()), Token::Str("<$1>".into())],
        )
        .unwrap();
        assert_eq!(out_texts(&store, &r), vec!["ab<1><2>cd", "none", "<7>-<8>"]);
    }

    #[test]
    fn test_replacement_templates() {
        let store = ColumnStore::new(vec![text("s", &["ab12cd"])]).unwrap();
        let replace = |pattern: &str, template: &str| {
            let args = [field(&store, "s"), Token::Str(pattern.into()), Token::Str(template.into())];
            out_texts(&store, &call(&store, "$replace", &args).unwrap()).remove(0)
        };
        // A digit after the group number is literal text.
        assert_eq!(replace(r"(\d)", "$1a"), "ab1a2acd");
        assert_eq!(replace(r"\d+", "[$&]"), "ab[12]cd");
        assert_eq!(replace(r"\d+", "$`|$'"), "abab|cdcd");
        assert_eq!(replace(r"\d+", "$$"), "ab$cd");
        assert_eq!(replace(r"(?<n>\d+)", "<$<n>>"), "ab<12>cd");
        // Missing groups and `$0` stay literal.
        assert_eq!(replace(r"\d+", "$1$0"), "ab$1$0cd");
        assert_eq!(replace(r"(\d)(\d)", "$21"), "ab21cd");
    }

    #[test]
    fn test_bad_regex_is_runtime_error() {
        let store = store();
        let err = call(&store, "$match", &[field(&store, "name"), Token::Str("(".into())]).unwrap_err();
        assert_eq!(err.kind(), Some(QueryErrorKind::Runtime));
        assert_eq!(store.derived_count(), 0);
    }
}
