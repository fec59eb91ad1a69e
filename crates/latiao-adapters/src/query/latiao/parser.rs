//! LaTiao Parser.
//!
//! Recursive descent over the token stream produced by [`Lexer`]:
//!
//! ```text
//! program  := item (',' item)* EOF
//! item     := export | expr
//! export   := 'out' [NAME ['=']] expr
//! expr     := term (('+'|'-') term)*
//! term     := unary (('*'|'/') unary)*
//! unary    := '-' NUMBER | postfix
//! postfix  := primary ('.' DIMKEY)*
//! primary  := NUMBER | STRING | IDENT | '`' any '`' | OPNAME '(' [arg (',' arg)*] ')' | '(' expr ')'
//! arg      := export | expr
//! ```

use latiao_common::utils::error::{Error, Result, SourceSpan};

use super::ast::{BinaryOp, Expr, ExprKind, Program};
use super::lexer::{Lexer, Token, TokenKind};

/// Nesting limit for parenthesized and call expressions, and the height
/// limit of any expression tree, so arithmetic chains count too.
const MAX_NESTING: usize = 256;

/// LaTiao parser.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            position: 0,
            depth: 0,
            source,
        }
    }

    /// Parses the source into a program.
    ///
    /// Errors carry a span and a location resolved against the source.
    pub fn parse(&mut self) -> Result<Program> {
        self.parse_program().map_err(|e| e.with_source(self.source))
    }

    fn parse_program(&mut self) -> Result<Program> {
        let start = self.current().span.start;
        let mut items = vec![self.parse_item()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            items.push(self.parse_item()?);
        }
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected());
        }
        let span = SourceSpan::new(start, self.current().span.end.max(start));
        let program = Program { items, span };
        Self::check_shape(&program)?;
        Ok(program)
    }

    /// A single statement may be a call, arithmetic, an export or a date
    /// member; a batch may only hold calls and exports.
    fn check_shape(program: &Program) -> Result<()> {
        let ok = match program.items.as_slice() {
            [single] => single.is_call() || matches!(single.kind, ExprKind::Export { .. } | ExprKind::Member { .. }),
            batch => batch
                .iter()
                .all(|item| matches!(item.kind, ExprKind::Call { .. } | ExprKind::Export { .. })),
        };
        if ok {
            return Ok(());
        }
        let culprit = program
            .items
            .iter()
            .find(|item| !matches!(item.kind, ExprKind::Call { .. } | ExprKind::Export { .. }))
            .map_or(program.span, |item| item.span);
        Err(Error::syntax("Expect one statement.").with_span(Some(culprit)))
    }

    fn parse_item(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::Out) {
            self.parse_export()
        } else {
            self.parse_expr()
        }
    }

    fn parse_export(&mut self) -> Result<Expr> {
        let start = self.current().span.start;
        self.expect(&TokenKind::Out)?;

        let name = match &self.current().kind {
            TokenKind::Ident(name) | TokenKind::Quoted(name) if self.names_export() => {
                let name = name.clone();
                self.advance();
                if self.check(&TokenKind::Eq) {
                    self.advance();
                }
                Some(name)
            }
            _ => None,
        };

        let expr = self.parse_expr()?;
        let span = SourceSpan::new(start, expr.span.end);
        Self::bounded(Expr::new(
            ExprKind::Export {
                name,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    /// After `out`, a name is only an export name when it is followed by `=`
    /// or by the start of another expression.
    fn names_export(&self) -> bool {
        match self.peek_kind() {
            Some(TokenKind::Eq) => true,
            Some(TokenKind::Minus) | None => false,
            Some(kind) => kind.starts_expression(),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Self::binary(op, lhs, rhs)?;
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs)?;
        }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr> {
        let span = lhs.span.merge(rhs.span);
        Self::bounded(Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    /// Rejects trees too tall for the recursive passes that follow parsing.
    fn bounded(expr: Expr) -> Result<Expr> {
        if expr.height() > MAX_NESTING {
            return Err(Error::syntax("Expression is nested too deeply").with_span(Some(expr.span)));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if !self.check(&TokenKind::Minus) {
            return self.parse_postfix();
        }
        let start = self.current().span.start;
        self.advance();
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(-n), SourceSpan::new(start, token.span.end)))
            }
            _ => Err(Error::syntax("Only number literals can be negated.").with_span(Some(token.span))),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            let token = self.current().clone();
            let TokenKind::Ident(key) = token.kind else {
                return Err(self.error("Expected a date dimension key after \".\""));
            };
            self.advance();
            let span = SourceSpan::new(expr.span.start, token.span.end);
            expr = Self::bounded(Expr::new(
                ExprKind::Member {
                    target: Box::new(expr),
                    key,
                    key_span: token.span,
                },
                span,
            ))?;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(n), token.span))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::String(s), token.span))
            }
            TokenKind::Ident(name) | TokenKind::Quoted(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), token.span))
            }
            TokenKind::OpName(op) => self.parse_call(op, token.span),
            TokenKind::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expr()?;
                self.depth -= 1;
                let close = self.expect(&TokenKind::RParen)?;
                Ok(Expr::new(inner.kind, SourceSpan::new(token.span.start, close.span.end)))
            }
            TokenKind::Out => Err(self.error("\"out\" is only allowed at the top level or as an operator argument")),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_call(&mut self, op: String, op_span: SourceSpan) -> Result<Expr> {
        self.advance();
        self.expect(&TokenKind::LParen)?;
        self.enter()?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_item()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_item()?);
            }
        }
        self.depth -= 1;
        let close = self.expect(&TokenKind::RParen)?;
        Self::bounded(Expr::new(
            ExprKind::Call { op, op_span, args },
            SourceSpan::new(op_span.start, close.span.end),
        ))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("Expression is nested too deeply"));
        }
        Ok(())
    }

    fn current(&self) -> &Token {
        // The stream always ends with Eof or an error token.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position + 1).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            let token = self.current().clone();
            self.advance();
            Ok(token)
        } else {
            Err(self.error(&format!(
                "Expected {}, found {}",
                kind.describe(),
                self.current().kind.describe()
            )))
        }
    }

    fn unexpected(&self) -> Error {
        let kind = &self.current().kind;
        match kind {
            TokenKind::Error(msg) => self.error(msg),
            other => self.error(&format!("Unexpected {}", other.describe())),
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::syntax(message).with_span(Some(self.current().span))
    }
}

#[cfg(test)]
mod tests {
    use latiao_common::utils::error::QueryErrorKind;

    use super::*;

    fn parse(src: &str) -> Result<Program> {
        Parser::new(src).parse()
    }

    fn single(src: &str) -> Expr {
        let mut program = parse(src).unwrap();
        assert_eq!(program.items.len(), 1);
        program.items.remove(0)
    }

    #[test]
    fn test_parse_export_call() {
        let expr = single("out y = $normalize(price)");
        let ExprKind::Export { name, expr } = expr.kind else { panic!("expected export") };
        assert_eq!(name.as_deref(), Some("y"));
        let ExprKind::Call { op, args, .. } = expr.kind else { panic!("expected call") };
        assert_eq!(op, "$normalize");
        assert_eq!(args, vec![Expr::new(ExprKind::Ident("price".into()), SourceSpan::new(19, 24))]);
    }

    #[test]
    fn test_export_name_forms() {
        for src in ["out y $f(x)", "out y=$f(x)", "out `my y` = $f(x)"] {
            let ExprKind::Export { name, .. } = single(src).kind else { panic!("{src}") };
            assert!(name.is_some(), "{src}");
        }
        let ExprKind::Export { name, expr } = single("out $f(x)").kind else { panic!() };
        assert!(name.is_none());
        assert!(expr.is_call());
        // A lone name after `out` is the exported expression.
        let ExprKind::Export { name, expr } = single("out x").kind else { panic!() };
        assert!(name.is_none());
        assert_eq!(expr.kind, ExprKind::Ident("x".into()));
    }

    #[test]
    fn test_precedence() {
        let expr = single("a + b * 2");
        let ExprKind::Binary { op, rhs, .. } = expr.kind else { panic!() };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));

        let expr = single("(a - b) / -2");
        let ExprKind::Binary { op, lhs, rhs } = expr.kind else { panic!() };
        assert_eq!(op, BinaryOp::Div);
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
        assert_eq!(rhs.kind, ExprKind::Number(-2.0));
    }

    #[test]
    fn test_member_chain() {
        let expr = single("$toDate(t).YMD.Y");
        let ExprKind::Member { target, key, .. } = expr.kind else { panic!() };
        assert_eq!(key, "Y");
        assert!(matches!(target.kind, ExprKind::Member { ref key, .. } if key == "YMD"));
    }

    #[test]
    fn test_batch_and_nested_exports() {
        let program = parse("out a = $f(x), $g(out b = $h(y), z)").unwrap();
        assert_eq!(program.items.len(), 2);
        let ExprKind::Call { args, .. } = &program.items[1].kind else { panic!() };
        assert!(matches!(args[0].kind, ExprKind::Export { .. }));
    }

    #[test]
    fn test_statement_shape() {
        for src in ["x", "1", "'s'", "$f(x), a + b", "$f(x), 1"] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.kind(), Some(QueryErrorKind::Syntax), "{src}");
            assert!(err.to_string().contains("Expect one statement"), "{src}");
        }
        assert!(parse("a * 2").is_ok());
        assert!(parse("$toDate(t).Y").is_ok());
    }

    #[test]
    fn test_syntax_errors_are_located() {
        let err = parse("out y = $f(x").unwrap_err();
        assert_eq!(err.kind(), Some(QueryErrorKind::Syntax));
        assert_eq!(err.location().unwrap().start, (1, 12));

        let err = parse("$f(x) $g(y)").unwrap_err();
        assert_eq!(err.location().unwrap().start, (1, 6));

        let err = parse("out y = -x").unwrap_err();
        assert!(err.to_string().contains("negated"));

        let err = parse("$f(x),\n  $g(")
            .unwrap_err();
        assert_eq!(err.location().unwrap().start.0, 2);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}x{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = parse(&deep).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_flat_chains_are_bounded() {
        let fits = vec!["x"; MAX_NESTING].join(" + ");
        assert_eq!(single(&fits).height(), MAX_NESTING);

        let long = vec!["x"; 20_000].join("+");
        let err = parse(&format!("out {long}")).unwrap_err();
        assert_eq!(err.kind(), Some(QueryErrorKind::Syntax));
        assert!(err.to_string().contains("nested too deeply"));
        assert!(err.location().is_some());

        let products = vec!["2"; MAX_NESTING + 1].join(" * ");
        assert!(parse(&format!("out x + {products}")).is_err());
    }
}
