//! The program store: every live program of one worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use latiao_common::types::{Column, ProgramId};
use latiao_common::utils::error::{Error, Result};
use latiao_common::utils::hash::FxHashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::protocol::{CreateProgramResult, ExecuteResult, Request, Response, ResponseData};
use crate::config::Config;
use crate::program::{Program, Runtime};

/// Owns programs and routes requests to them.
///
/// The map lock is only held to look a program up; executions run on the
/// program's own lock, so distinct programs may run concurrently.
pub struct ProgramStore {
    runtime: Runtime,
    programs: RwLock<FxHashMap<ProgramId, Arc<Program>>>,
    next_id: AtomicU64,
}

impl ProgramStore {
    /// Creates an empty store with the default runtime for `config`.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_runtime(Runtime::new(config)?))
    }

    /// Creates an empty store around a prepared runtime.
    #[must_use]
    pub fn with_runtime(runtime: Runtime) -> Self {
        Self {
            runtime,
            programs: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Shared runtime.
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Number of live programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    /// Returns whether no program is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds `columns` as a new program and returns its id.
    pub fn create_program(&self, columns: Vec<Column>) -> Result<ProgramId> {
        let id = ProgramId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let program = Program::new(id, columns)?;

        // The limit is checked under the same lock as the insert.
        let mut programs = self.programs.write();
        if let Some(max) = self.runtime.config.max_programs
            && programs.len() >= max
        {
            return Err(Error::runtime(format!("Too many programs, the limit is {max}.")));
        }
        info!(
            program = %id,
            columns = program.store().origin_count(),
            rows = program.store().row_count(),
            "program created"
        );
        programs.insert(id, Arc::new(program));
        Ok(id)
    }

    /// Looks a live program up.
    pub fn program(&self, id: ProgramId) -> Result<Arc<Program>> {
        self.programs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::name(format!("Cannot find program {id}.")))
    }

    /// Runs `source` against program `id`.
    pub fn execute(&self, id: ProgramId, source: &str) -> Result<Vec<Column>> {
        let program = self.program(id)?;
        program.execute(source, &self.runtime)
    }

    /// Frees program `id`.
    ///
    /// An execution already running on it finishes against its own handle.
    pub fn destroy_program(&self, id: ProgramId) -> Result<()> {
        match self.programs.write().remove(&id) {
            Some(_) => {
                info!(program = %id, "program destroyed");
                Ok(())
            }
            None => Err(Error::name(format!("Cannot find program {id}."))),
        }
    }

    /// Serves one request.
    pub fn handle(&self, request: Request) -> Response {
        debug!(task = request.task(), "handling request");
        let result = match request {
            Request::CreateProgram { data } => self
                .create_program(data)
                .map(|program_id| ResponseData::Created(CreateProgramResult { program_id })),
            Request::Execute { program_id, source } => self
                .execute(program_id, &source)
                .map(|columns| ResponseData::Executed(ExecuteResult::from(columns))),
            Request::DestroyProgram { program_id } => {
                self.destroy_program(program_id).map(|()| ResponseData::Destroyed(true))
            }
        };
        Response::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use latiao_common::types::{ColumnData, FieldMode, FieldToken};
    use latiao_common::utils::error::QueryErrorKind;

    use super::*;

    fn columns(n: usize) -> Vec<Column> {
        vec![Column {
            token: FieldToken::origin("x", "x", FieldMode::Vec),
            data: ColumnData::Numbers((0..n).map(|i| i as f64).collect()),
        }]
    }

    #[test]
    fn test_lifecycle() {
        let store = ProgramStore::new(Config::default()).unwrap();
        let a = store.create_program(columns(3)).unwrap();
        let b = store.create_program(columns(3)).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        let out = store.execute(a, "out y = $normalize(x)").unwrap();
        assert_eq!(out[0].token.name, "y");
        // Programs do not see each other's columns.
        assert_eq!(store.execute(b, "out $id(y)").unwrap_err().kind(), Some(QueryErrorKind::Name));

        store.destroy_program(a).unwrap();
        assert_eq!(store.execute(a, "out $id(x)").unwrap_err().kind(), Some(QueryErrorKind::Name));
        assert!(store.destroy_program(a).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_program_limit() {
        let store = ProgramStore::new(Config::default().with_max_programs(1)).unwrap();
        let a = store.create_program(columns(1)).unwrap();
        assert!(store.create_program(columns(1)).is_err());
        store.destroy_program(a).unwrap();
        assert!(store.create_program(columns(1)).is_ok());
    }

    #[test]
    fn test_program_limit_holds_under_contention() {
        const MAX: usize = 4;
        let store = Arc::new(ProgramStore::new(Config::default().with_max_programs(MAX)).unwrap());
        let barrier = Arc::new(Barrier::new(MAX + 8));
        let handles: Vec<_> = (0..MAX + 8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.create_program(columns(10)).is_ok()
                })
            })
            .collect();
        let created = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(created, MAX);
        assert_eq!(store.len(), MAX);
    }

    #[test]
    fn test_inconsistent_lengths_rejected() {
        let store = ProgramStore::new(Config::default()).unwrap();
        let mut data = columns(2);
        data.push(Column {
            token: FieldToken::origin("y", "y", FieldMode::Vec),
            data: ColumnData::Numbers(vec![1.0]),
        });
        let response = store.handle(Request::CreateProgram { data });
        assert!(!response.is_success());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_programs() {
        let store = Arc::new(ProgramStore::new(Config::default()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = store.create_program(columns(100)).unwrap();
                    for _ in 0..5 {
                        store.execute(id, "out $log($zeroFill(x))").unwrap();
                    }
                    store.program(id).unwrap().store().derived_count()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 10);
        }
    }
}
