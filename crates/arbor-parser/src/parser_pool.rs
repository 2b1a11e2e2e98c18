//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not `Sync`, so each worker thread owns one and
//! requests arrive over a channel. Workers return fully lowered `SourceUnit`s,
//! so nothing tree-sitter specific crosses a thread boundary.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use arbor_core::{Language, SourceUnit};
use tree_sitter::Parser;

use crate::languages::grammar_for;
use crate::lower::parse_with;
use crate::{read_input, Input};

/// A parsing request sent to the parser pool
#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub language: Language,
    pub content: String,
    pub path: Option<PathBuf>,
}

impl ParseRequest {
    pub fn new(language: Language, content: impl Into<String>) -> Self {
        ParseRequest { language, content: content.into(), path: None }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Internal message for the parser worker
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<SourceUnit>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
    workers: usize,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender, workers: num_workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let Ok(WorkerRequest { request, response_sender }) = next else {
                break;
            };

            let grammar = grammar_for(request.language);
            let unit = parse_with(&mut parser, grammar, request.content, request.path);

            if response_sender.send(unit).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
        tracing::debug!("Parser worker {} shutting down", worker_id);
    }

    /// Parse content, blocking the current thread until a worker answers.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<SourceUnit> {
        submit(&self.sender, request)
    }

    /// Parse content asynchronously using the parser pool
    pub async fn parse(&self, request: ParseRequest) -> Result<SourceUnit> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || submit(&sender, request))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Read and parse a file. Invalid UTF-8 comes back as an unparseable
    /// unit; a missing or unreadable file is an error.
    pub async fn parse_file(&self, path: &Path, language: Option<Language>) -> Result<SourceUnit> {
        match read_input(path, language)? {
            Input::Text { path, language, text } => {
                self.parse(ParseRequest::new(language, text).with_path(path)).await
            }
            Input::Invalid(unit) => Ok(unit),
        }
    }
}

fn submit(sender: &Sender<WorkerRequest>, request: ParseRequest) -> Result<SourceUnit> {
    let (response_sender, response_receiver) = mpsc::channel();
    sender
        .send(WorkerRequest { request, response_sender })
        .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;
    response_receiver
        .recv()
        .map_err(|_| anyhow::anyhow!("Parser worker died"))
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}
