//! Scripted `ProcessRunner` standing in for the adb executable.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Answers commands from a list of canned replies and records every call.
///
/// Replies are tried in registration order; the first one whose program (and
/// arguments, when given) match is used. A command with no matching reply
/// fails with `ProcessError::Unscripted`.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    replies: Arc<Mutex<Vec<CannedReply>>>,
    calls: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct CannedReply {
    program: String,
    args: Option<Vec<String>>,
    outcome: CannedOutcome,
}

enum CannedOutcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    NotFound,
}

/// One reply under construction; registered by `add`.
pub struct ReplyBuilder {
    runner: MockProcessRunner,
    reply: CannedReply,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a reply for `program`, matching any arguments.
    pub fn on(&self, program: &str) -> ReplyBuilder {
        ReplyBuilder {
            runner: self.clone(),
            reply: CannedReply {
                program: program.to_string(),
                args: None,
                outcome: CannedOutcome::Exited {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                },
            },
        }
    }

    /// Every command run so far, oldest first.
    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.program == program)
            .count()
    }
}

impl ReplyBuilder {
    /// Only answer when the arguments are exactly `args`.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.reply.args = Some(args.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn stdout(mut self, text: &str) -> Self {
        if let CannedOutcome::Exited { stdout, .. } = &mut self.reply.outcome {
            *stdout = text.to_string();
        }
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        if let CannedOutcome::Exited { stderr, .. } = &mut self.reply.outcome {
            *stderr = text.to_string();
        }
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        if let CannedOutcome::Exited { status, .. } = &mut self.reply.outcome {
            *status = if code == 0 {
                ExitStatus::Success
            } else {
                ExitStatus::Error(code)
            };
        }
        self
    }

    /// Behave as if the executable were missing from PATH.
    pub fn not_found(mut self) -> Self {
        self.reply.outcome = CannedOutcome::NotFound;
        self
    }

    pub fn add(self) {
        self.runner.replies.lock().unwrap().push(self.reply);
    }
}

impl CannedReply {
    fn matches(&self, command: &ProcessCommand) -> bool {
        self.program == command.program
            && self.args.as_ref().map_or(true, |args| *args == command.args)
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(command.clone());

        let replies = self.replies.lock().unwrap();
        let reply = replies
            .iter()
            .find(|reply| reply.matches(&command))
            .ok_or_else(|| ProcessError::Unscripted(command.display()))?;

        match &reply.outcome {
            CannedOutcome::NotFound => Err(ProcessError::CommandNotFound(command.program.clone())),
            CannedOutcome::Exited {
                status,
                stdout,
                stderr,
            } => Ok(ProcessOutput {
                status: status.clone(),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                duration: Duration::ZERO,
            }),
        }
    }
}
