//! Subprocess plumbing: one-shot commands and the long-running log producer.

pub mod error;
pub mod mock;
pub mod runner;
pub mod stream_reader;


pub use error::ProcessError;
pub use mock::{MockProcessRunner, ReplyBuilder};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use stream_reader::{ReadOutcome, ReaderOptions, StreamReader, MIN_IDLE_BACKOFF};

use std::sync::Arc;

#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }
}
