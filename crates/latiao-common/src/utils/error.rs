//! Error types for LaTiao.
//!
//! Every failure a program can hit is classified into one of four query error
//! kinds (syntax, type, name, runtime). Query errors optionally carry a
//! [`SourceSpan`] into the user's text, which is turned into a line/column
//! [`SourceLocation`] once the source is attached.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for LaTiao operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for LaTiao.
#[derive(Error, Debug)]
pub enum Error {
    /// A parse, type, name or runtime failure of a LaTiao program.
    #[error("{0}")]
    Query(QueryError),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),

    /// Message or dataset (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure (dataset files, CLI input).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Query(QueryError::new(QueryErrorKind::Syntax, message))
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Query(QueryError::new(QueryErrorKind::Type, message))
    }

    /// Creates a name error.
    pub fn name(message: impl Into<String>) -> Self {
        Self::Query(QueryError::new(QueryErrorKind::Name, message))
    }

    /// Creates a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Query(QueryError::new(QueryErrorKind::Runtime, message))
    }

    /// Attaches a span if this is a query error without one.
    #[must_use]
    pub fn with_span(self, span: Option<SourceSpan>) -> Self {
        match (self, span) {
            (Self::Query(err), Some(span)) if err.span.is_none() => Self::Query(err.with_span(span)),
            (other, _) => other,
        }
    }

    /// Resolves the span of a query error against the program text.
    #[must_use]
    pub fn with_source(self, source: &str) -> Self {
        match self {
            Self::Query(err) => Self::Query(err.with_source(source)),
            other => other,
        }
    }

    /// Returns the query error kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<QueryErrorKind> {
        match self {
            Self::Query(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Returns the resolved location of a query error, if any.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::Query(err) => err.location,
            _ => None,
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Self::Query(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Classification of query errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryErrorKind {
    /// Malformed grammar, wrong statement shape, unknown operator, missing `out`.
    Syntax,
    /// Overload resolution failure, invalid slice target or dimension.
    Type,
    /// Unresolved identifier, duplicate column write, unknown program id.
    Name,
    /// Operator-internal failure (e.g. a malformed regex).
    Runtime,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "SyntaxError"),
            Self::Type => write!(f, "TypeError"),
            Self::Name => write!(f, "NameError"),
            Self::Runtime => write!(f, "RuntimeError"),
        }
    }
}

/// A query error with optional position information.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// Error kind.
    pub kind: QueryErrorKind,
    /// Human readable message.
    pub message: String,
    /// Byte span into the program text.
    pub span: Option<SourceSpan>,
    /// Line/column location, resolved from `span` once the source is known.
    pub location: Option<SourceLocation>,
}

impl QueryError {
    /// Creates a new query error.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            location: None,
        }
    }

    /// Sets the span.
    #[must_use]
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Resolves the span into a line/column location.
    ///
    /// Spans that fall outside `source` are dropped rather than mis-reported.
    #[must_use]
    pub fn with_source(mut self, source: &str) -> Self {
        if self.location.is_none() {
            self.location = self.span.and_then(|span| SourceLocation::resolve(source, span));
        }
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {}

/// Half-open byte range `[start, end)` into program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl SourceSpan {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the smallest span covering both.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// `[[start_line, start_col], [end_line, end_col]]`, lines 1-based and
/// columns 0-based (in characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[[usize; 2]; 2]", into = "[[usize; 2]; 2]")]
pub struct SourceLocation {
    /// Start `(line, column)`.
    pub start: (usize, usize),
    /// End `(line, column)`.
    pub end: (usize, usize),
}

impl SourceLocation {
    /// Maps a byte span onto line/column coordinates of `source`.
    ///
    /// Returns `None` when the span does not lie inside the text.
    #[must_use]
    pub fn resolve(source: &str, span: SourceSpan) -> Option<Self> {
        if span.start > span.end || span.end > source.len() {
            return None;
        }
        if !source.is_char_boundary(span.start) || !source.is_char_boundary(span.end) {
            return None;
        }
        Some(Self {
            start: line_col(source, span.start),
            end: line_col(source, span.end),
        })
    }
}

fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, source[line_start..offset].chars().count())
}

impl From<[[usize; 2]; 2]> for SourceLocation {
    fn from(raw: [[usize; 2]; 2]) -> Self {
        Self {
            start: (raw[0][0], raw[0][1]),
            end: (raw[1][0], raw[1][1]),
        }
    }
}

impl From<SourceLocation> for [[usize; 2]; 2] {
    fn from(loc: SourceLocation) -> Self {
        [[loc.start.0, loc.start.1], [loc.end.0, loc.end.1]]
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[[{}, {}], [{}, {}]]",
            self.start.0, self.start.1, self.end.0, self.end.1
        )
    }
}
