//! Programs: one column store and the executions run against it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use latiao_adapters::ChronoDateParser;
use latiao_adapters::query::latiao;
use latiao_common::types::{Column, OpToken, ProgramId};
use latiao_common::utils::error::{Error, Result};
use latiao_core::{
    ColumnStore, DateParser, ExpressionEvaluator, MetaHook, OperatorRegistry, ProgramContext,
    SandboxEvaluator,
};
use parking_lot::Mutex;
use tracing::{info, info_span, warn};

use crate::config::Config;
use crate::query::{Executor, Resolver};

/// Services shared by every program of a store.
pub struct Runtime {
    /// Operator library.
    pub registry: OperatorRegistry,
    /// Limits and defaults.
    pub config: Config,
    date_parser: Box<dyn DateParser>,
    evaluator: Box<dyn ExpressionEvaluator>,
    meta_hook: Option<Arc<dyn MetaHook>>,
}

impl Runtime {
    /// Creates a runtime with the built-in operators, the chrono date parser
    /// and the sandboxed evaluator.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            registry: OperatorRegistry::with_builtins()?,
            date_parser: Box::new(ChronoDateParser::new()),
            evaluator: Box::new(SandboxEvaluator::new(config.eval_max_depth)),
            meta_hook: None,
            config,
        })
    }

    /// Replaces the date parser.
    #[must_use]
    pub fn with_date_parser(mut self, parser: impl DateParser + 'static) -> Self {
        self.date_parser = Box::new(parser);
        self
    }

    /// Replaces the pointwise expression evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Installs a hook that sees the exported columns of every successful
    /// execution.
    #[must_use]
    pub fn with_meta_hook(mut self, hook: Arc<dyn MetaHook>) -> Self {
        self.meta_hook = Some(hook);
        self
    }

    fn context<'a>(&'a self, store: &'a ColumnStore) -> ProgramContext<'a> {
        ProgramContext::new(store, self.date_parser.as_ref(), self.evaluator.as_ref())
            .with_separator(&self.config.concat_separator)
    }
}

/// A program: an immutable snapshot of origin columns plus everything derived
/// from it so far.
///
/// Executions of one program are serialized; distinct programs share nothing.
pub struct Program {
    id: ProgramId,
    store: ColumnStore,
    lock: Mutex<()>,
    executions: AtomicU64,
}

impl Program {
    /// Binds `columns` as the origin set.
    pub fn new(id: ProgramId, columns: Vec<Column>) -> Result<Self> {
        Ok(Self {
            id,
            store: ColumnStore::new(columns)?,
            lock: Mutex::new(()),
            executions: AtomicU64::new(0),
        })
    }

    /// Program id.
    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Column store.
    #[must_use]
    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    /// Number of executions attempted so far.
    #[must_use]
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Parses, resolves and runs `source`, returning the exported columns
    /// with public ids.
    ///
    /// Query errors carry a location inside `source`. Columns derived before
    /// a failure are kept.
    pub fn execute(&self, source: &str, runtime: &Runtime) -> Result<Vec<Column>> {
        let _guard = self.lock.lock();
        let seq = self.executions.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("execute", program = %self.id, seq);
        let _enter = span.enter();

        match self.run(source, runtime) {
            Ok(columns) => {
                info!(exported = columns.len(), derived = self.store.derived_count(), "program executed");
                if let Some(hook) = &runtime.meta_hook {
                    hook.on_columns(&columns);
                }
                Ok(columns)
            }
            Err(err) => {
                let err = err.with_source(source);
                warn!(error = %err, "program execution failed");
                Err(err)
            }
        }
    }

    /// Parses and resolves `source` without running it, returning the
    /// signatures of the top-level calls.
    pub fn check(&self, source: &str, runtime: &Runtime) -> Result<Vec<String>> {
        let roots = self.resolve(source, runtime).map_err(|e| e.with_source(source))?;
        Ok(roots
            .iter()
            .filter_map(|root| runtime.registry.get(&root.op, root.overload))
            .map(ToString::to_string)
            .collect())
    }

    fn resolve(&self, source: &str, runtime: &Runtime) -> Result<Vec<OpToken>> {
        let limit = runtime.config.max_source_len;
        if source.len() > limit {
            return Err(Error::syntax(format!(
                "Program text is {} bytes long, the limit is {limit}.",
                source.len()
            )));
        }
        let ast = latiao::parse(source)?;
        let ctx = runtime.context(&self.store);
        Resolver::new(&runtime.registry, &ctx).resolve(&ast)
    }

    fn run(&self, source: &str, runtime: &Runtime) -> Result<Vec<Column>> {
        let roots = self.resolve(source, runtime)?;
        let ctx = runtime.context(&self.store);
        let fids = Executor::new(&runtime.registry, &ctx).execute(roots)?;

        fids.iter()
            .map(|fid| {
                let token = self.store.field(fid.as_str());
                let data = self.store.data(fid.as_str());
                match (token, data) {
                    (Some(token), Some(data)) => Ok(Column {
                        token: token.to_public(),
                        data: (*data).clone(),
                    }),
                    _ => Err(Error::name(format!("Cannot find column \"{fid}\"."))),
                }
            })
            .collect()
    }
}
