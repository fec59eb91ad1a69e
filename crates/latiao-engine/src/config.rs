//! Engine configuration.

use latiao_core::eval::DEFAULT_MAX_DEPTH;

/// Limits and defaults applied by a [`ProgramStore`](crate::worker::ProgramStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of live programs; `None` means unbounded.
    pub max_programs: Option<usize>,
    /// Nesting limit of `$map`/`$test`/`$partition` expressions.
    pub eval_max_depth: usize,
    /// Maximum program text length in bytes.
    pub max_source_len: usize,
    /// Separator `$concat` uses when none is given.
    pub concat_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_programs: Some(1024),
            eval_max_depth: DEFAULT_MAX_DEPTH,
            max_source_len: 64 * 1024,
            concat_separator: ",".to_string(),
        }
    }
}

impl Config {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LATIAO_MAX_PROGRAMS`: maximum live programs, `0` for unbounded
    /// - `LATIAO_EVAL_MAX_DEPTH`: evaluator nesting limit
    /// - `LATIAO_MAX_SOURCE_LEN`: maximum program text length in bytes
    /// - `LATIAO_CONCAT_SEPARATOR`: default `$concat` separator
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    /// Unparsable values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("LATIAO_MAX_PROGRAMS").and_then(|s| s.trim().parse::<usize>().ok()) {
            cfg.max_programs = (v > 0).then_some(v);
        }

        if let Some(v) = lookup("LATIAO_EVAL_MAX_DEPTH").and_then(|s| s.trim().parse::<usize>().ok()) {
            cfg.eval_max_depth = v;
        }

        if let Some(v) = lookup("LATIAO_MAX_SOURCE_LEN").and_then(|s| s.trim().parse::<usize>().ok()) {
            cfg.max_source_len = v;
        }

        if let Some(sep) = lookup("LATIAO_CONCAT_SEPARATOR") {
            cfg.concat_separator = sep;
        }

        cfg
    }

    /// Sets the maximum number of live programs.
    #[must_use]
    pub fn with_max_programs(mut self, max: usize) -> Self {
        self.max_programs = Some(max);
        self
    }

    /// Removes the live program limit.
    #[must_use]
    pub fn with_unbounded_programs(mut self) -> Self {
        self.max_programs = None;
        self
    }

    /// Sets the evaluator nesting limit.
    #[must_use]
    pub fn with_eval_max_depth(mut self, depth: usize) -> Self {
        self.eval_max_depth = depth;
        self
    }

    /// Sets the maximum program text length.
    #[must_use]
    pub fn with_max_source_len(mut self, len: usize) -> Self {
        self.max_source_len = len;
        self
    }

    /// Sets the default `$concat` separator.
    #[must_use]
    pub fn with_concat_separator(mut self, sep: impl Into<String>) -> Self {
        self.concat_separator = sep.into();
        self
    }
}
