//! Operator registry.
//!
//! Operators are statically overloaded: several entries may share a name as
//! long as their signatures differ. A call is bound to the single overload
//! whose fixed arguments match element-wise and whose trailing type accepts
//! every extra argument.

use std::fmt;

use latiao_common::types::{Token, TokenType};
use latiao_common::utils::error::{Error, Result};
use latiao_common::utils::hash::FxHashMap;
use smallvec::SmallVec;

use crate::context::ExecutionContext;

/// Operator implementation.
pub type ExecFn = fn(&dyn ExecutionContext, &[Token]) -> Result<Token>;

/// Prefix of operators reserved for desugaring.
pub const SECRET_PREFIX: &str = "$__";

/// One overload.
#[derive(Clone)]
pub struct Operator {
    /// Name, including the `$` sigil.
    pub name: &'static str,
    /// Fixed-arity argument types.
    pub args: SmallVec<[TokenType; 4]>,
    /// Type of any number of extra arguments.
    pub trailing: Option<TokenType>,
    /// Result type.
    pub returns: TokenType,
    /// Whether user text may not call this directly.
    pub secret: bool,
    /// Implementation.
    pub exec: ExecFn,
}

impl Operator {
    /// Creates an overload with fixed arguments only.
    pub fn new(name: &'static str, args: &[TokenType], returns: TokenType, exec: ExecFn) -> Self {
        Self {
            name,
            args: SmallVec::from_slice(args),
            trailing: None,
            returns,
            secret: name.starts_with(SECRET_PREFIX),
            exec,
        }
    }

    /// Accepts any number of extra arguments of type `ty`.
    #[must_use]
    pub fn with_trailing(mut self, ty: TokenType) -> Self {
        self.trailing = Some(ty);
        self
    }

    /// Returns whether this overload accepts `args`.
    #[must_use]
    pub fn accepts(&self, args: &[TokenType]) -> bool {
        if args.len() < self.args.len() {
            return false;
        }
        let (fixed, extra) = args.split_at(self.args.len());
        if fixed != self.args.as_slice() {
            return false;
        }
        match self.trailing {
            Some(ty) => extra.iter().all(|a| *a == ty),
            None => extra.is_empty(),
        }
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.args == other.args && self.trailing == other.trailing
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} -> {}", self.returns)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Signature { name: self.name, args: &self.args, trailing: self.trailing })
    }
}

struct Signature<'a> {
    name: &'a str,
    args: &'a [TokenType],
    trailing: Option<TokenType>,
}

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut first = true;
        for arg in self.args {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{arg}")?;
        }
        if let Some(ty) = self.trailing {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "...{ty}")?;
        }
        f.write_str(")")
    }
}

/// Collection of operator overloads, keyed by name.
#[derive(Default)]
pub struct OperatorRegistry {
    operators: FxHashMap<&'static str, Vec<Operator>>,
}

impl OperatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in operator library.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        crate::operators::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Adds an overload. Fails with a type error if the same signature is
    /// already registered under this name.
    pub fn register(&mut self, op: Operator) -> Result<()> {
        let overloads = self.operators.entry(op.name).or_default();
        if let Some(existing) = overloads.iter().find(|o| o.same_signature(&op)) {
            return Err(Error::type_error(format!("Operator {existing} is already defined.")));
        }
        overloads.push(op);
        Ok(())
    }

    /// Returns whether any overload is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Binds a call to an overload, returning its index and entry.
    ///
    /// Fails with a syntax error for an unknown name and a type error when no
    /// overload, or more than one, accepts `args`.
    pub fn resolve(&self, name: &str, args: &[TokenType]) -> Result<(usize, &Operator)> {
        let overloads = self
            .operators
            .get(name)
            .ok_or_else(|| Error::syntax(format!("Operator {name} is not defined.")))?;

        let mut matches = overloads.iter().enumerate().filter(|(_, o)| o.accepts(args));
        let attempted = Signature { name, args, trailing: None };
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (None, _) => Err(Error::type_error(format!(
                "No overload of {name} matches {attempted}. Candidates: {}.",
                overloads.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            ))),
            (Some(_), Some(_)) => Err(Error::type_error(format!("Call {attempted} is ambiguous."))),
        }
    }

    /// Returns the overload at `index` under `name`.
    #[must_use]
    pub fn get(&self, name: &str, index: usize) -> Option<&Operator> {
        self.operators.get(name).and_then(|o| o.get(index))
    }

    /// Overloads callable from program text, sorted by name.
    #[must_use]
    pub fn public_overloads(&self) -> Vec<&Operator> {
        let mut out: Vec<&Operator> = self
            .operators
            .values()
            .flatten()
            .filter(|o| !o.secret)
            .collect();
        out.sort_by(|a, b| a.name.cmp(b.name));
        out
    }

    /// Total number of overloads, secret ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.values().map(Vec::len).sum()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Iterates every overload.
    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values().flatten()
    }
}
