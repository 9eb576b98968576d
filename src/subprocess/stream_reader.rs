//! Incremental line reader over a long-running log producer.
//!
//! The producer's stdout is drained by a dedicated task into a bounded FIFO
//! queue, so a slow consumer back-pressures the pipe instead of reordering or
//! losing lines. `next_line` waits at most one poll interval for the queue,
//! which is also the idle back-off of the run loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, TokioProcessRunner};

/// Lower bound on the idle wait between polls.
pub const MIN_IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Idle polls tolerated after the producer exited before the stream is closed,
/// giving the pump task time to flush what was left in the pipe.
const EXIT_DRAIN_POLLS: u32 = 2;

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Longest time `next_line` waits for output before reporting `Idle`.
    pub poll_interval: Duration,
    /// Time allowed between the terminate request and a forced kill.
    pub stop_grace: Duration,
    /// Window after spawn during which a failing exit is a launch error.
    pub launch_probe: Duration,
    /// Capacity of the line queue between the pump task and the consumer.
    pub queue_capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            poll_interval: MIN_IDLE_BACKOFF,
            stop_grace: Duration::from_secs(5),
            launch_probe: Duration::from_millis(250),
            queue_capacity: 1024,
        }
    }
}

/// Result of one poll of the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Nothing arrived within the poll interval.
    Idle,
    /// The producer exited or was stopped; no further lines will arrive.
    EndOfStream,
}

/// Owns one producer subprocess and exposes its stdout line by line.
pub struct StreamReader {
    program: String,
    child: Option<Child>,
    lines: mpsc::Receiver<String>,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    options: ReaderOptions,
    exit_status: Option<ExitStatus>,
    idle_polls_after_exit: u32,
    finished: bool,
}

impl StreamReader {
    /// Spawn the producer and begin draining its output.
    ///
    /// Fails when the executable is missing or when the producer exits with a
    /// failure inside the launch probe window (for `adb`, an unreachable device).
    pub async fn start(
        command: &ProcessCommand,
        options: ReaderOptions,
    ) -> Result<Self, ProcessError> {
        info!("Starting log producer: {}", command.display());

        let mut child = TokioProcessRunner::configure_command(command)
            .spawn()
            .map_err(|e| TokioProcessRunner::map_spawn_error(e, &command.program))?;

        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ProcessError::MissingPipe("stderr"))?;

        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));

        let stdout_task = tokio::spawn(pump_lines(stdout, tx));
        let stderr_task = tokio::spawn(log_stderr(
            stderr,
            command.program.clone(),
            Arc::clone(&stderr_tail),
        ));

        let options = ReaderOptions {
            poll_interval: options.poll_interval.max(MIN_IDLE_BACKOFF),
            ..options
        };

        let mut reader = Self {
            program: command.program.clone(),
            child: Some(child),
            lines: rx,
            stdout_task,
            stderr_task,
            stderr_tail,
            options,
            exit_status: None,
            idle_polls_after_exit: 0,
            finished: false,
        };

        reader.probe_launch().await?;
        Ok(reader)
    }

    async fn probe_launch(&mut self) -> Result<(), ProcessError> {
        if self.options.launch_probe.is_zero() {
            return Ok(());
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        let status = match tokio::time::timeout(self.options.launch_probe, child.wait()).await {
            Err(_) => return Ok(()),
            Ok(Err(e)) => return Err(ProcessError::Io(e)),
            Ok(Ok(status)) => ExitStatus::from_std(status),
        };
        self.exit_status = Some(status.clone());

        match status {
            ExitStatus::Success | ExitStatus::Timeout => {
                debug!("{} exited immediately with {}", self.program, status);
                Ok(())
            }
            ExitStatus::Error(code) => {
                // stderr reaches EOF right after exit; let the tail catch up
                let _ = tokio::time::timeout(MIN_IDLE_BACKOFF, &mut self.stderr_task).await;
                Err(ProcessError::ExitCode {
                    code,
                    stderr: self.stderr_summary(),
                })
            }
            ExitStatus::Signal(signal) => Err(ProcessError::Signal(signal)),
        }
    }

    /// Wait for the next line, at most one poll interval.
    pub async fn next_line(&mut self) -> ReadOutcome {
        if self.finished {
            return ReadOutcome::EndOfStream;
        }

        match tokio::time::timeout(self.options.poll_interval, self.lines.recv()).await {
            Ok(Some(line)) => ReadOutcome::Line(line),
            Ok(None) => {
                debug!("{} output closed", self.program);
                self.finished = true;
                ReadOutcome::EndOfStream
            }
            Err(_) => {
                if self.has_exited() {
                    self.idle_polls_after_exit += 1;
                    if self.idle_polls_after_exit >= EXIT_DRAIN_POLLS {
                        self.finished = true;
                        return ReadOutcome::EndOfStream;
                    }
                }
                ReadOutcome::Idle
            }
        }
    }

    /// Terminate the producer: SIGTERM, then SIGKILL after the grace period.
    ///
    /// Calling this on an already stopped reader does nothing.
    pub async fn stop(&mut self) {
        self.finished = true;
        self.lines.close();

        let Some(mut child) = self.child.take() else {
            return;
        };

        if self.exit_status.is_none() {
            if let Ok(Some(status)) = child.try_wait() {
                self.exit_status = Some(ExitStatus::from_std(status));
            }
        }

        if let Some(status) = &self.exit_status {
            debug!("{} already exited with {}", self.program, status);
        } else {
            request_terminate(&mut child);
            match tokio::time::timeout(self.options.stop_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    let status = ExitStatus::from_std(status);
                    info!("{} stopped ({})", self.program, status);
                    self.exit_status = Some(status);
                }
                Ok(Err(e)) => warn!("Failed waiting for {} to stop: {}", self.program, e),
                Err(_) => {
                    warn!(
                        "{} did not exit within {:?}, killing it",
                        self.program, self.options.stop_grace
                    );
                    force_kill(&mut child).await;
                    self.exit_status = Some(ExitStatus::Signal(9));
                }
            }
        }

        self.stdout_task.abort();
        self.stderr_task.abort();
    }

    /// Liveness check; records the exit status the first time it is seen.
    pub fn has_exited(&mut self) -> bool {
        if self.exit_status.is_some() {
            return true;
        }
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                let status = ExitStatus::from_std(status);
                info!("{} exited ({})", self.program, status);
                self.exit_status = Some(status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to poll {} status: {}", self.program, e);
                false
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.child.is_some() && !self.has_exited()
    }

    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn poll_interval(&self) -> Duration {
        self.options.poll_interval
    }

    fn stderr_summary(&self) -> String {
        let tail = self
            .stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join("; "))
            .unwrap_or_default();
        if tail.is_empty() {
            "no diagnostic output".to_string()
        } else {
            tail
        }
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        // The child itself is killed on drop
        self.stdout_task.abort();
        self.stderr_task.abort();
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        // Negative pid targets the whole process group
        let pgid = Pid::from_raw(-(pid as i32));
        if let Err(e) = nix::sys::signal::kill(pgid, signal) {
            debug!("Failed to send {} to process group {}: {}", signal, pid, e);
        }
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    signal_group(child, nix::sys::signal::Signal::SIGTERM);
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

async fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGKILL);

    if let Err(e) = child.kill().await {
        warn!("Failed to kill log producer: {}", e);
    }
}

/// Remove the trailing newline (and carriage return) from a raw line
fn normalize_line(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

async fn pump_lines<R>(stdout: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = normalize_line(String::from_utf8_lossy(&buf).into_owned());
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read producer output: {}", e);
                break;
            }
        }
    }
}

async fn log_stderr<R>(stderr: R, program: String, tail: Arc<Mutex<VecDeque<String>>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = normalize_line(String::from_utf8_lossy(&buf).into_owned());
                debug!("{} stderr: {}", program, line);
                if let Ok(mut tail) = tail.lock() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        }
    }
}
