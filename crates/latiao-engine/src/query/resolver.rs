//! Static resolution of a parsed program.
//!
//! Turns the AST into a tree of [`OpToken`]s: identifiers are bound to
//! fields, every call is bound to exactly one overload, arithmetic is
//! desugared into the secret `$__*` operators, and date member access is
//! validated and lowered. Nothing is executed here.

use latiao_adapters::query::latiao::{Expr, ExprKind, Program};
use latiao_common::types::{DateDimension, DateDimensions, Export, OpToken, Token, TokenType};
use latiao_common::utils::error::{Error, Result, SourceSpan};
use latiao_core::ExecutionContext;
use latiao_core::registry::{OperatorRegistry, SECRET_PREFIX};

const PROJECT_DATE: &str = "$__projDate";
const SLICE_DATE: &str = "$__sliceDate";

/// Binds a program against a registry and the fields of a context.
pub struct Resolver<'a> {
    registry: &'a OperatorRegistry,
    ctx: &'a dyn ExecutionContext,
    exports: usize,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver.
    pub fn new(registry: &'a OperatorRegistry, ctx: &'a dyn ExecutionContext) -> Self {
        Self {
            registry,
            ctx,
            exports: 0,
        }
    }

    /// Resolves every top-level item into a call.
    ///
    /// Fails with a syntax error if nothing in the program is exported.
    pub fn resolve(mut self, program: &Program) -> Result<Vec<OpToken>> {
        let mut roots = Vec::with_capacity(program.items.len());
        for item in &program.items {
            match self.resolve_expr(item)? {
                Token::Op(op) => roots.push(op),
                _ => return Err(Error::syntax("Expect one statement.").with_span(Some(item.span))),
            }
        }
        if self.exports == 0 {
            return Err(Error::syntax(
                "Expression should include at least one \"out\" flag to export columns.",
            )
            .with_span(Some(program.span)));
        }
        Ok(roots)
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<Token> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Token::Num(*n)),
            ExprKind::String(s) => Ok(Token::Str(s.clone())),
            ExprKind::Ident(name) => self
                .ctx
                .resolve_fid(name)
                .map(Token::Field)
                .map_err(|e| e.with_span(Some(expr.span))),
            ExprKind::Call { op, op_span, args } => {
                if op.starts_with(SECRET_PREFIX) {
                    return Err(Error::syntax(format!("Operator {op} is not defined.")).with_span(Some(*op_span)));
                }
                let args = args
                    .iter()
                    .map(|arg| self.resolve_expr(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.call(op, args, expr.span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let args = vec![self.resolve_expr(lhs)?, self.resolve_expr(rhs)?];
                self.call(op.operator(), args, expr.span)
            }
            ExprKind::Member { target, key, key_span } => {
                let (date, available) = self.date_target(target)?;
                let dims = check_key(key, available, *key_span)?;
                let op = if dims.len() == 1 { PROJECT_DATE } else { SLICE_DATE };
                self.call(op, vec![date, Token::Str(key.clone())], expr.span)
            }
            ExprKind::Export { name, expr: inner } => {
                let Token::Op(mut op) = self.resolve_expr(inner)? else {
                    return Err(Error::syntax("Expect operator here.").with_span(Some(inner.span)));
                };
                self.exports += 1;
                op.export = Some(Export { name: name.clone() });
                Ok(Token::Op(op))
            }
        }
    }

    /// Resolves the target of a member access to a date-valued call and the
    /// dimensions it still exposes. Chained accesses narrow the set.
    fn date_target(&mut self, expr: &Expr) -> Result<(Token, DateDimensions)> {
        if let ExprKind::Member { target, key, key_span } = &expr.kind {
            let (date, available) = self.date_target(target)?;
            let dims = check_key(key, available, *key_span)?;
            return Ok((date, dims.into_iter().collect()));
        }
        let token = self.resolve_expr(expr)?;
        if !matches!(&token, Token::Op(op) if op.output == TokenType::Date) {
            return Err(Error::type_error(format!(
                "Member access is only allowed on a date, found {}.",
                token.token_type()
            ))
            .with_span(Some(expr.span)));
        }
        Ok((token, DateDimensions::ALL))
    }

    fn call(&self, name: &str, args: Vec<Token>, span: SourceSpan) -> Result<Token> {
        let types: Vec<TokenType> = args.iter().map(Token::token_type).collect();
        let (overload, operator) = self
            .registry
            .resolve(name, &types)
            .map_err(|e| e.with_span(Some(span)))?;
        Ok(Token::Op(OpToken {
            op: name.to_string(),
            overload,
            args,
            output: operator.returns,
            export: None,
            span: Some(span),
        }))
    }
}

/// Parses a dimension key and checks it against what the target exposes.
fn check_key(key: &str, available: DateDimensions, span: SourceSpan) -> Result<Vec<DateDimension>> {
    let dims = DateDimension::parse_key(key).map_err(|e| e.with_span(Some(span)))?;
    if let Some(missing) = dims.iter().find(|d| !available.contains(**d)) {
        return Err(Error::type_error(format!(
            "Dimension \"{missing}\" is not available here, available: \"{available}\"."
        ))
        .with_span(Some(span)));
    }
    Ok(dims.into_vec())
}
