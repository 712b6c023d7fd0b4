//! Handle to a running acquisition unit

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

/// How long to wait for output readers to drain after the process exits.
/// Grandchildren can inherit the pipes and keep them open indefinitely.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How long to wait for a killed process to be reaped
const KILL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How an acquisition unit finished
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitExit {
    /// Zero exit status, or the library call returned `Ok`
    Success,
    /// Non-zero exit, killed by a signal, or the library call returned an error
    Failure {
        /// Exit code, when the process exited normally
        exit_code: Option<i32>,
        /// Trailing output or error text
        diagnostic: String,
    },
}

/// Bounded buffer holding the last `capacity` bytes of unit output
#[derive(Debug)]
pub(crate) struct DiagnosticTail {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl DiagnosticTail {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity.min(64 * 1024)),
            capacity,
        }
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        self.bytes.extend(line.as_bytes());
        self.bytes.push_back(b'\n');
        while self.bytes.len() > self.capacity {
            self.bytes.pop_front();
        }
    }

    pub(crate) fn render(&self) -> String {
        let (a, b) = self.bytes.as_slices();
        let mut raw = Vec::with_capacity(a.len() + b.len());
        raw.extend_from_slice(a);
        raw.extend_from_slice(b);
        String::from_utf8_lossy(&raw).trim().to_string()
    }
}

type SharedTail = Arc<Mutex<DiagnosticTail>>;

fn spawn_reader<R>(stream: R, tail: SharedTail) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::trace!(line = %line, "unit output");
            if let Ok(mut tail) = tail.lock() {
                tail.push_line(&line);
            }
        }
    })
}

/// A spawned external process with its output captured into a bounded tail
#[derive(Debug)]
pub struct ProcessUnit {
    child: Child,
    tail: SharedTail,
    readers: Vec<JoinHandle<()>>,
}

impl ProcessUnit {
    /// Wrap a spawned child; piped stdout/stderr are drained into the diagnostic tail
    pub fn new(mut child: Child, tail_bytes: usize) -> Self {
        let tail = Arc::new(Mutex::new(DiagnosticTail::new(tail_bytes)));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tail.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tail.clone()));
        }
        Self {
            child,
            tail,
            readers,
        }
    }

    /// OS process id, while the process is running
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn diagnostic(&self) -> String {
        self.tail.lock().map(|t| t.render()).unwrap_or_default()
    }

    async fn wait(&mut self) -> UnitExit {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => {
                return UnitExit::Failure {
                    exit_code: None,
                    diagnostic: format!("failed to wait for process: {e}"),
                };
            }
        };

        for reader in std::mem::take(&mut self.readers) {
            let _ = tokio::time::timeout(READER_DRAIN_TIMEOUT, reader).await;
        }

        if status.success() {
            UnitExit::Success
        } else {
            let mut diagnostic = self.diagnostic();
            if diagnostic.is_empty() {
                diagnostic = format!("process exited with {status}");
            }
            UnitExit::Failure {
                exit_code: status.code(),
                diagnostic,
            }
        }
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // InvalidInput means the process was already reaped
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!(error = %e, "failed to kill acquisition process");
            }
            return;
        }
        if tokio::time::timeout(KILL_WAIT_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            tracing::warn!(pid = ?self.child.id(), "acquisition process did not exit after kill");
        }
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}

/// The running acquisition unit of one job.
///
/// External tools run as [`AcquisitionUnit::Process`]. In-process
/// acquisitions (a library call) run as [`AcquisitionUnit::Task`] and
/// report failure as an error string.
///
/// [`AcquisitionUnit::wait`] is cancel-safe but must not be called again
/// once it has returned.
#[derive(Debug)]
pub enum AcquisitionUnit {
    /// External process
    Process(ProcessUnit),
    /// Spawned async task
    Task(JoinHandle<std::result::Result<(), String>>),
}

impl AcquisitionUnit {
    /// Spawn an in-process acquisition
    pub fn spawn_task<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        AcquisitionUnit::Task(tokio::spawn(future))
    }

    /// Wait for the unit to finish
    pub async fn wait(&mut self) -> UnitExit {
        match self {
            AcquisitionUnit::Process(process) => process.wait().await,
            AcquisitionUnit::Task(handle) => match handle.await {
                Ok(Ok(())) => UnitExit::Success,
                Ok(Err(diagnostic)) => UnitExit::Failure {
                    exit_code: None,
                    diagnostic,
                },
                Err(e) if e.is_cancelled() => UnitExit::Failure {
                    exit_code: None,
                    diagnostic: "acquisition task was cancelled".into(),
                },
                Err(e) => UnitExit::Failure {
                    exit_code: None,
                    diagnostic: format!("acquisition task panicked: {e}"),
                },
            },
        }
    }

    /// Force-stop the unit; a no-op if it already finished
    pub async fn terminate(&mut self) {
        match self {
            AcquisitionUnit::Process(process) => process.terminate().await,
            AcquisitionUnit::Task(handle) => handle.abort(),
        }
    }
}

impl Drop for AcquisitionUnit {
    fn drop(&mut self) {
        // Processes are spawned with kill_on_drop; tasks need an explicit abort
        if let AcquisitionUnit::Task(handle) = self {
            handle.abort();
        }
    }
}
