//! The isolated execution worker.
//!
//! A [`Worker`] owns a [`ProgramStore`] on a dedicated thread. Clients talk to
//! it only through [`Request`] messages; replies come back on a oneshot
//! channel, so the handle can be awaited from async code or blocked on from
//! plain threads.

pub mod protocol;
pub mod router;
pub mod store;

pub use protocol::{CreateProgramResult, ExecuteResult, Request, Response, ResponseData};
pub use router::route_json;
pub use store::ProgramStore;

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use latiao_common::types::{Column, ProgramId};
use latiao_common::utils::error::{Error, Result};
use tokio::sync::oneshot;
use tracing::{debug, info};

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Handle to a store running on its own thread.
///
/// Requests are served one at a time, in arrival order. Dropping the handle
/// stops the thread after the queued requests are served.
pub struct Worker {
    sender: Option<Sender<Envelope>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Moves `store` onto a new worker thread.
    pub fn spawn(store: ProgramStore) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Envelope>();
        let thread = thread::Builder::new()
            .name("latiao-worker".into())
            .spawn(move || {
                info!("worker started");
                for Envelope { request, reply } in receiver {
                    let response = store.handle(request);
                    if reply.send(response).is_err() {
                        debug!("client dropped before the reply");
                    }
                }
                info!(programs = store.len(), "worker stopped");
            })?;
        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    fn submit(&self, request: Request) -> Result<oneshot::Receiver<Response>> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .as_ref()
            .ok_or_else(|| Error::Internal("worker is shut down".into()))?
            .send(Envelope { request, reply })
            .map_err(|_| Error::Internal("worker thread is gone".into()))?;
        Ok(receiver)
    }

    /// Sends a request and awaits the reply.
    pub async fn request(&self, request: Request) -> Result<Response> {
        let receiver = self.submit(request)?;
        receiver
            .await
            .map_err(|_| Error::Internal("worker dropped the request".into()))
    }

    /// Sends a request and blocks until the reply arrives.
    ///
    /// Must not be called from inside an async runtime.
    pub fn request_blocking(&self, request: Request) -> Result<Response> {
        let receiver = self.submit(request)?;
        receiver
            .blocking_recv()
            .map_err(|_| Error::Internal("worker dropped the request".into()))
    }

    /// Binds `columns` as a new program.
    pub async fn create_program(&self, columns: Vec<Column>) -> Result<ProgramId> {
        match self.request(Request::CreateProgram { data: columns }).await?.into_result()? {
            ResponseData::Created(created) => Ok(created.program_id),
            other => Err(unexpected("createProgram", &other)),
        }
    }

    /// Runs `source` against program `id`.
    pub async fn execute(&self, id: ProgramId, source: impl Into<String>) -> Result<ExecuteResult> {
        let request = Request::Execute {
            program_id: id,
            source: source.into(),
        };
        match self.request(request).await?.into_result()? {
            ResponseData::Executed(result) => Ok(result),
            other => Err(unexpected("execute", &other)),
        }
    }

    /// Frees program `id`.
    pub async fn destroy_program(&self, id: ProgramId) -> Result<()> {
        self.request(Request::DestroyProgram { program_id: id })
            .await?
            .into_result()
            .map(|_| ())
    }
}

fn unexpected(task: &str, data: &ResponseData) -> Error {
    Error::Internal(format!("unexpected reply to {task}: {data:?}"))
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            debug!("worker thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use latiao_common::types::{ColumnData, FieldMode, FieldToken};

    use super::*;
    use crate::config::Config;

    fn columns() -> Vec<Column> {
        vec![Column {
            token: FieldToken::origin("p", "price", FieldMode::Vec),
            data: ColumnData::Numbers(vec![1.0, 2.0, f64::NAN, 100.0]),
        }]
    }

    #[tokio::test]
    async fn test_async_client() {
        let worker = Worker::spawn(ProgramStore::new(Config::default()).unwrap()).unwrap();
        let id = worker.create_program(columns()).await.unwrap();
        let result = worker.execute(id, "out clean = $zeroFill(price)").await.unwrap();
        assert_eq!(result.columns[0].as_numbers().unwrap(), &[1.0, 2.0, 0.0, 100.0]);
        assert_eq!(result.enter[0].name, "clean");

        let err = worker.execute(id, "$zeroFill(price)").await.unwrap_err();
        assert!(err.to_string().contains("out"));

        worker.destroy_program(id).await.unwrap();
        assert!(worker.destroy_program(id).await.is_err());
    }

    #[test]
    fn test_blocking_client() {
        let worker = Worker::spawn(ProgramStore::new(Config::default()).unwrap()).unwrap();
        let response = worker
            .request_blocking(Request::CreateProgram { data: columns() })
            .unwrap();
        let ResponseData::Created(created) = response.into_result().unwrap() else {
            panic!("expected createProgram reply")
        };
        let response = worker
            .request_blocking(Request::Execute {
                program_id: created.program_id,
                source: "out $normalize(price)".into(),
            })
            .unwrap();
        assert!(response.is_success());
    }
}
