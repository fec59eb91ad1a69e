//! Tree-walking interpreter.

use latiao_common::utils::error::Result;

use super::syntax::{BinaryOp, Builtin, Expr, Method, UnaryOp};
use super::{CompiledExpression, EvalError, Value};

/// A parsed expression.
pub(super) struct Compiled {
    expr: Expr,
    max_depth: usize,
}

impl Compiled {
    pub(super) fn new(expr: Expr, max_depth: usize) -> Self {
        Self { expr, max_depth }
    }
}

impl CompiledExpression for Compiled {
    fn eval(&self, d: &Value, i: usize) -> Result<Value> {
        let mut vm = Vm {
            d,
            i,
            depth: 0,
            max_depth: self.max_depth,
        };
        Ok(vm.eval(&self.expr)?)
    }
}

/// Evaluation of one row.
struct Vm<'a> {
    d: &'a Value,
    i: usize,
    depth: usize,
    max_depth: usize,
}

impl Vm<'_> {
    fn eval(&mut self, expr: &Expr) -> std::result::Result<Value, EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        let value = self.step(expr);
        self.depth -= 1;
        value
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> std::result::Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn step(&mut self, expr: &Expr) -> std::result::Result<Value, EvalError> {
        Ok(match expr {
            Expr::Lit(v) => v.clone(),
            Expr::D => self.d.clone(),
            Expr::I => Value::Num(self.i as f64),
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => Value::Num(-v.to_number()),
                    UnaryOp::Plus => Value::Num(v.to_number()),
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                }
            }
            Expr::Binary(op, l, r) => {
                let left = self.eval(l)?;
                binary(*op, left, self.eval(r)?)
            }
            Expr::And(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() { self.eval(r)? } else { left }
            }
            Expr::Or(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() { left } else { self.eval(r)? }
            }
            Expr::Cond(c, t, e) => {
                if self.eval(c)?.is_truthy() {
                    self.eval(t)?
                } else {
                    self.eval(e)?
                }
            }
            Expr::Call(f, args) => call(*f, &self.eval_all(args)?),
            Expr::Length(target) => match self.eval(target)? {
                Value::Str(s) => Value::Num(s.chars().count() as f64),
                _ => Value::Undefined,
            },
            Expr::Method(target, method, args) => {
                let receiver = self.eval(target)?;
                let Value::Str(s) = receiver else {
                    return Err(EvalError::NotAFunction(format!("{receiver}.{}", method.name())));
                };
                string_method(&s, *method, &self.eval_all(args)?)
            }
        })
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Value {
    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{l}{r}")),
            _ => Value::Num(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => Value::Num(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Num(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Num(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Num(l.to_number() % r.to_number()),
        BinaryOp::Pow => Value::Num(pow(l.to_number(), r.to_number())),
        BinaryOp::Lt => Value::Bool(compare(&l, &r, |o| o.is_lt())),
        BinaryOp::Le => Value::Bool(compare(&l, &r, |o| o.is_le())),
        BinaryOp::Gt => Value::Bool(compare(&l, &r, |o| o.is_gt())),
        BinaryOp::Ge => Value::Bool(compare(&l, &r, |o| o.is_ge())),
        BinaryOp::LooseEq => Value::Bool(loose_eq(&l, &r)),
        BinaryOp::LooseNe => Value::Bool(!loose_eq(&l, &r)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(&l, &r)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(&l, &r)),
    }
}

fn pow(base: f64, exp: f64) -> f64 {
    if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exp)
    }
}

/// Strings compare lexicographically, everything else numerically; NaN
/// compares false.
fn compare(l: &Value, r: &Value, accept: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::Str(a), Value::Str(b)) = (l, r) {
        return accept(a.cmp(b));
    }
    l.to_number().partial_cmp(&r.to_number()).is_some_and(accept)
}

fn strict_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => a == b,
        _ => l == r,
    }
}

fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Undefined, _) | (_, Value::Undefined) => false,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => l.to_number() == r.to_number(),
    }
}

fn arg_num(args: &[Value], n: usize) -> f64 {
    args.get(n).map_or(f64::NAN, Value::to_number)
}

fn call(f: Builtin, args: &[Value]) -> Value {
    let x = arg_num(args, 0);
    match f {
        Builtin::Abs => Value::Num(x.abs()),
        Builtin::Floor => Value::Num(x.floor()),
        Builtin::Ceil => Value::Num(x.ceil()),
        Builtin::Round => Value::Num((x + 0.5).floor()),
        Builtin::Sqrt => Value::Num(x.sqrt()),
        Builtin::Log => Value::Num(x.ln()),
        Builtin::Log2 => Value::Num(x.log2()),
        Builtin::Log10 => Value::Num(x.log10()),
        Builtin::Exp => Value::Num(x.exp()),
        Builtin::Pow => Value::Num(pow(x, arg_num(args, 1))),
        Builtin::Sign => Value::Num(if x.is_nan() || x == 0.0 { x } else { x.signum() }),
        Builtin::Trunc => Value::Num(x.trunc()),
        Builtin::Min => Value::Num(fold_extreme(args, f64::INFINITY, f64::min)),
        Builtin::Max => Value::Num(fold_extreme(args, f64::NEG_INFINITY, f64::max)),
        Builtin::Number => Value::Num(if args.is_empty() { 0.0 } else { x }),
        Builtin::String => Value::Str(args.first().map(ToString::to_string).unwrap_or_default()),
        Builtin::IsNaN => Value::Bool(x.is_nan()),
        Builtin::IsFinite => Value::Bool(x.is_finite()),
    }
}

/// `f64::min`/`max` skip NaN; any NaN argument must poison the result.
fn fold_extreme(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for v in args {
        let n = v.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, n);
    }
    acc
}

fn arg_str(args: &[Value], n: usize) -> String {
    args.get(n).map(ToString::to_string).unwrap_or_else(|| "undefined".to_string())
}

/// Resolves a possibly negative character index against `len`.
fn rel_index(v: f64, len: usize) -> usize {
    if v.is_nan() {
        return 0;
    }
    let v = v.trunc();
    if v < 0.0 {
        (len as f64 + v).max(0.0) as usize
    } else {
        v.min(len as f64) as usize
    }
}

fn string_method(s: &str, method: Method, args: &[Value]) -> Value {
    match method {
        Method::ToUpperCase => Value::Str(s.to_uppercase()),
        Method::ToLowerCase => Value::Str(s.to_lowercase()),
        Method::Trim => Value::Str(s.trim().to_string()),
        Method::Slice => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len();
            let start = args.first().map_or(0, |v| rel_index(v.to_number(), len));
            let end = match args.get(1) {
                None | Some(Value::Undefined) => len,
                Some(v) => rel_index(v.to_number(), len),
            };
            Value::Str(if start < end { chars[start..end].iter().collect() } else { String::new() })
        }
        Method::Includes => Value::Bool(s.contains(arg_str(args, 0).as_str())),
        Method::StartsWith => Value::Bool(s.starts_with(arg_str(args, 0).as_str())),
        Method::EndsWith => Value::Bool(s.ends_with(arg_str(args, 0).as_str())),
        Method::IndexOf => {
            let needle = arg_str(args, 0);
            Value::Num(
                s.find(needle.as_str())
                    .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
            )
        }
    }
}
