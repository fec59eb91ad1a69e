//! Lexer, tree and parser of evaluator expressions.

use super::{EvalError, Value};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

const PUNCTS: [&str; 25] = [
    "===", "!==", "**", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!",
    "?", ":", "(", ")", ",", ".", "[", "]",
];

fn lex(src: &str) -> Result<Vec<(Tok, usize)>, EvalError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    'outer: while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                i += 1;
                if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                    i += 1;
                }
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text = &src[start..i];
            let value = text.parse::<f64>().map_err(|_| EvalError::Syntax {
                found: format!("number {text}"),
                offset: start,
            })?;
            out.push((Tok::Num(value), start));
            continue;
        }

        if c == b'\'' || c == b'"' {
            let mut value = String::new();
            let mut chars = src[i + 1..].char_indices();
            while let Some((off, ch)) = chars.next() {
                match ch {
                    _ if ch as u32 == u32::from(c) => {
                        i = i + 1 + off + 1;
                        out.push((Tok::Str(value), start));
                        continue 'outer;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, other)) => value.push(other),
                        None => break,
                    },
                    _ => value.push(ch),
                }
            }
            return Err(EvalError::Syntax {
                found: "unterminated string".into(),
                offset: start,
            });
        }

        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$') {
                i += 1;
            }
            out.push((Tok::Ident(src[start..i].to_string()), start));
            continue;
        }

        match PUNCTS.iter().find(|p| src[i..].starts_with(**p)) {
            Some(p) => {
                i += p.len();
                out.push((Tok::Punct(*p), start));
            }
            None => {
                let found = src[i..].chars().next().map_or_else(String::new, |ch| format!("\"{ch}\""));
                return Err(EvalError::Syntax { found, offset: start });
            }
        }
    }

    out.push((Tok::Eof, src.len()));
    Ok(out)
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// Binary operators other than the short-circuiting ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
}

/// Whitelisted free functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Builtin {
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Log,
    Log2,
    Log10,
    Exp,
    Min,
    Max,
    Pow,
    Sign,
    Trunc,
    Number,
    String,
    IsNaN,
    IsFinite,
}

/// Whitelisted string methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Method {
    ToUpperCase,
    ToLowerCase,
    Trim,
    Slice,
    Includes,
    StartsWith,
    EndsWith,
    IndexOf,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "toUpperCase" => Self::ToUpperCase,
            "toLowerCase" => Self::ToLowerCase,
            "trim" => Self::Trim,
            "slice" => Self::Slice,
            "includes" => Self::Includes,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "indexOf" => Self::IndexOf,
            _ => return None,
        })
    }

    pub(super) fn name(self) -> &'static str {
        match self {
            Self::ToUpperCase => "toUpperCase",
            Self::ToLowerCase => "toLowerCase",
            Self::Trim => "trim",
            Self::Slice => "slice",
            Self::Includes => "includes",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::IndexOf => "indexOf",
        }
    }
}

fn math_builtin(name: &str) -> Option<Builtin> {
    Some(match name {
        "abs" => Builtin::Abs,
        "floor" => Builtin::Floor,
        "ceil" => Builtin::Ceil,
        "round" => Builtin::Round,
        "sqrt" => Builtin::Sqrt,
        "log" => Builtin::Log,
        "log2" => Builtin::Log2,
        "log10" => Builtin::Log10,
        "exp" => Builtin::Exp,
        "min" => Builtin::Min,
        "max" => Builtin::Max,
        "pow" => Builtin::Pow,
        "sign" => Builtin::Sign,
        "trunc" => Builtin::Trunc,
        _ => return None,
    })
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Lit(Value),
    D,
    I,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Builtin, Vec<Expr>),
    Method(Box<Expr>, Method, Vec<Expr>),
    Length(Box<Expr>),
}

impl Expr {
    /// Nodes on the longest path from this node to a leaf.
    pub(super) fn height(&self) -> usize {
        let below = match self {
            Expr::Lit(_) | Expr::D | Expr::I => 0,
            Expr::Unary(_, e) | Expr::Length(e) => e.height(),
            Expr::Binary(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) => l.height().max(r.height()),
            Expr::Cond(c, t, e) => c.height().max(t.height()).max(e.height()),
            Expr::Call(_, args) => args.iter().map(Expr::height).max().unwrap_or(0),
            Expr::Method(target, _, args) => args.iter().map(Expr::height).fold(target.height(), usize::max),
        };
        below + 1
    }
}

/// Parses a complete expression.
pub(super) fn parse(src: &str, max_depth: usize) -> Result<Expr, EvalError> {
    let mut parser = Parser {
        tokens: lex(src)?,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let expr = parser.ternary()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, p: &str) -> bool {
        if matches!(self.peek(), Tok::Punct(q) if *q == p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> EvalError {
        let found = match self.peek() {
            Tok::Num(n) => format!("number {n}"),
            Tok::Str(s) => format!("string \"{s}\""),
            Tok::Ident(s) => format!("identifier {s}"),
            Tok::Punct(p) => format!("\"{p}\""),
            Tok::Eof => "end of expression".to_string(),
        };
        EvalError::Syntax {
            found,
            offset: self.offset(),
        }
    }

    fn expect(&mut self, p: &str) -> Result<(), EvalError> {
        if self.eat(p) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn expect_eof(&self) -> Result<(), EvalError> {
        if *self.peek() == Tok::Eof { Ok(()) } else { Err(self.unexpected()) }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    /// Admits a freshly built node. Every compound node passes through here,
    /// so children are already within the limit and `height` stays shallow.
    fn node(&self, expr: Expr) -> Result<Expr, EvalError> {
        if expr.height() > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr, EvalError> {
        self.enter()?;
        let cond = self.or()?;
        let expr = if self.eat("?") {
            let then = self.ternary()?;
            self.expect(":")?;
            let otherwise = self.ternary()?;
            self.node(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))?
        } else {
            cond
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.eat("||") {
            let right = self.and()?;
            left = self.node(Expr::Or(Box::new(left), Box::new(right)))?;
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.binary_level(0)?;
        while self.eat("&&") {
            let right = self.binary_level(0)?;
            left = self.node(Expr::And(Box::new(left), Box::new(right)))?;
        }
        Ok(left)
    }

    /// Left-associative levels, loosest first.
    fn binary_level(&mut self, level: usize) -> Result<Expr, EvalError> {
        const LEVELS: [&[(&str, BinaryOp)]; 4] = [
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::LooseEq),
                ("!=", BinaryOp::LooseNe),
            ],
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.power();
        };
        let mut left = self.binary_level(level + 1)?;
        'scan: loop {
            for (p, op) in *ops {
                if self.eat(p) {
                    let right = self.binary_level(level + 1)?;
                    left = self.node(Expr::Binary(*op, Box::new(left), Box::new(right)))?;
                    continue 'scan;
                }
            }
            return Ok(left);
        }
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let unary_start = matches!(self.peek(), Tok::Punct("-" | "+" | "!"));
        let base = self.unary()?;
        if matches!(self.peek(), Tok::Punct("**")) {
            if unary_start {
                // `-a ** b` is ambiguous; parentheses are required.
                return Err(self.unexpected());
            }
            self.pos += 1;
            self.enter()?;
            let exponent = self.power()?;
            self.depth -= 1;
            return self.node(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Tok::Punct("-") => UnaryOp::Neg,
            Tok::Punct("+") => UnaryOp::Plus,
            Tok::Punct("!") => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        self.node(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        while self.eat(".") {
            let name = match self.bump() {
                Tok::Ident(name) => name,
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
            };
            if name == "length" {
                expr = self.node(Expr::Length(Box::new(expr)))?;
                continue;
            }
            let method = Method::parse(&name).ok_or(EvalError::NotAFunction(name))?;
            let args = self.call_args()?;
            expr = self.node(Expr::Method(Box::new(expr), method, args))?;
        }
        Ok(expr)
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, EvalError> {
        self.expect("(")?;
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(")") {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn builtin(&mut self, f: Builtin) -> Result<Expr, EvalError> {
        let args = self.call_args()?;
        self.node(Expr::Call(f, args))
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.bump() {
            Tok::Num(n) => Ok(Expr::Lit(Value::Num(n))),
            Tok::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Tok::Punct("(") => {
                let expr = self.ternary()?;
                self.expect(")")?;
                Ok(expr)
            }
            Tok::Ident(name) => match name.as_str() {
                "d" => Ok(Expr::D),
                "i" => Ok(Expr::I),
                "true" => Ok(Expr::Lit(Value::Bool(true))),
                "false" => Ok(Expr::Lit(Value::Bool(false))),
                "NaN" => Ok(Expr::Lit(Value::Num(f64::NAN))),
                "Infinity" => Ok(Expr::Lit(Value::Num(f64::INFINITY))),
                "undefined" => Ok(Expr::Lit(Value::Undefined)),
                "Number" => self.builtin(Builtin::Number),
                "String" => self.builtin(Builtin::String),
                "isNaN" => self.builtin(Builtin::IsNaN),
                "isFinite" => self.builtin(Builtin::IsFinite),
                "Math" => {
                    self.expect(".")?;
                    let member = match self.bump() {
                        Tok::Ident(member) => member,
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected());
                        }
                    };
                    match member.as_str() {
                        "PI" => Ok(Expr::Lit(Value::Num(std::f64::consts::PI))),
                        "E" => Ok(Expr::Lit(Value::Num(std::f64::consts::E))),
                        _ => {
                            let f = math_builtin(&member)
                                .ok_or_else(|| EvalError::NotAFunction(format!("Math.{member}")))?;
                            self.builtin(f)
                        }
                    }
                }
                _ => Err(EvalError::UnknownIdentifier(name)),
            },
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }
}
