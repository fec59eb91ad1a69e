//! Serve the worker protocol over stdin/stdout.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use latiao_engine::worker::router::{parse_request, render};
use latiao_engine::worker::Response;
use latiao_engine::{Config, ProgramStore, Worker};
use tracing::info;

/// Run the serve command.
///
/// Each input line is one JSON request; each reply is written as one line.
/// Blank lines are skipped and the server stops at end of input.
pub fn run(config: Config) -> Result<()> {
    let worker = Worker::spawn(ProgramStore::new(config)?)?;
    info!("serving worker requests on stdin");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match parse_request(&line) {
            Ok(request) => worker.request_blocking(request)?,
            Err(message) => Response::Failure(message),
        };
        writeln!(stdout, "{}", render(&response))?;
        stdout.flush()?;
    }
    Ok(())
}
