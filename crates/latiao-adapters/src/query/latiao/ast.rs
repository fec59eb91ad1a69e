//! LaTiao Abstract Syntax Tree.

use latiao_common::utils::error::SourceSpan;

/// A parsed program: one statement, or a comma-joined batch of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level items in source order.
    pub items: Vec<Expr>,
    /// Span of the whole program.
    pub span: SourceSpan,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// What the node is.
    pub kind: ExprKind,
    /// Source span.
    pub span: SourceSpan,
    height: usize,
}

/// Binary arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// The operator this desugars to.
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Add => "$__add",
            Self::Sub => "$__minus",
            Self::Mul => "$__multiply",
            Self::Div => "$__divide",
        }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Number literal.
    Number(f64),
    /// String literal.
    String(String),
    /// Field reference by id or name.
    Ident(String),
    /// Operator call.
    Call {
        /// Operator name, with `$`.
        op: String,
        /// Span of the operator name.
        op_span: SourceSpan,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Binary arithmetic.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Date dimension access, `target.KEY`.
    Member {
        /// Date-valued target.
        target: Box<Expr>,
        /// Dimension key such as `YM`.
        key: String,
        /// Span of the key.
        key_span: SourceSpan,
    },
    /// `out [name [=]] expr`.
    Export {
        /// Chosen output name.
        name: Option<String>,
        /// Exported expression.
        expr: Box<Expr>,
    },
}

impl Expr {
    /// Creates a node.
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        let below = match &kind {
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Ident(_) => 0,
            ExprKind::Call { args, .. } => args.iter().map(Expr::height).max().unwrap_or(0),
            ExprKind::Binary { lhs, rhs, .. } => lhs.height.max(rhs.height),
            ExprKind::Member { target, .. } => target.height,
            ExprKind::Export { expr, .. } => expr.height,
        };
        Self {
            kind,
            span,
            height: below + 1,
        }
    }

    /// Number of nodes on the longest path from this node to a leaf.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns whether this node is an operator call, including desugared
    /// arithmetic.
    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::Binary { .. })
    }
}
