//! Isolated executor: runs snippets in a separate OS process.
//!
//! The snippet is written to a temporary file and launched under an external
//! interpreter with piped output and a hard wall-clock timeout. Isolation is
//! process-level only; this is not a security sandbox.
//!
//! Failures of the target code are never surfaced as errors. Every child
//! failure mode — non-zero exit, timeout, stderr noise, even an unspawnable
//! interpreter — is captured as data on the returned outcome.

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{categorize_stderr, ErrorCategory, ExecutionOutcome, RawExecutionResult, MAX_OUTPUT_BYTES};

/// Time allowed for the capture tasks to observe EOF after a kill.
///
/// A killed interpreter can leave an orphaned grandchild holding the pipe
/// write ends, so the pipes may never close; the capture buffers already
/// hold everything produced so far and only need a brief settle window.
const KILLED_DRAIN_WINDOW: Duration = Duration::from_millis(100);

/// Configuration for the isolated executor.
#[derive(Debug, Clone)]
pub struct IsolatedConfig {
    /// Interpreter binary used to run the snippet.
    pub interpreter: PathBuf,
    /// Suffix for the temporary snippet file.
    pub source_suffix: String,
    /// Default wall-clock timeout.
    pub timeout: Duration,
    /// Grace period after a kill before giving up on the child.
    pub kill_grace: Duration,
    /// Per-stream output capture cap in bytes.
    pub max_output_bytes: usize,
}

impl IsolatedConfig {
    /// Creates a configuration for the given interpreter.
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            source_suffix: ".py".to_string(),
            timeout: Duration::from_secs(30),
            kill_grace: Duration::from_secs(5),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    /// Python interpreter preset.
    pub fn python() -> Self {
        Self::new("python3")
    }

    /// Shell interpreter preset.
    pub fn shell() -> Self {
        let mut config = Self::new("/bin/sh");
        config.source_suffix = ".sh".to_string();
        config
    }

    /// Sets the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the snippet file suffix.
    pub fn with_source_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.source_suffix = suffix.into();
        self
    }

    /// Sets the per-stream output cap.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}

impl Default for IsolatedConfig {
    fn default() -> Self {
        Self::python()
    }
}

/// Executes snippets in a child process with timeout enforcement.
pub struct IsolatedExecutor {
    config: IsolatedConfig,
}

impl IsolatedExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: IsolatedConfig) -> Self {
        Self { config }
    }

    /// Creates an executor with the default (Python) configuration.
    pub fn with_defaults() -> Self {
        Self::new(IsolatedConfig::default())
    }

    /// Returns the executor configuration.
    pub fn config(&self) -> &IsolatedConfig {
        &self.config
    }

    /// Executes a snippet with the configured default timeout.
    pub async fn execute(&self, code: &str) -> RawExecutionResult {
        self.execute_with_timeout(code, self.config.timeout).await
    }

    /// Executes a snippet with an explicit wall-clock timeout.
    pub async fn execute_with_timeout(&self, code: &str, timeout: Duration) -> RawExecutionResult {
        RawExecutionResult::Isolated {
            outcome: self.run(code, timeout).await,
        }
    }

    async fn run(&self, code: &str, timeout: Duration) -> ExecutionOutcome {
        let start = Instant::now();

        // The NamedTempFile guard removes the snippet on every exit path.
        let mut source = match tempfile::Builder::new()
            .suffix(&self.config.source_suffix)
            .tempfile()
        {
            Ok(file) => file,
            Err(err) => return infrastructure_failure(1, ErrorCategory::Io, &err.to_string(), start),
        };
        if let Err(err) = source.write_all(code.as_bytes()) {
            return infrastructure_failure(1, ErrorCategory::Io, &err.to_string(), start);
        }
        if let Err(err) = source.flush() {
            return infrastructure_failure(1, ErrorCategory::Io, &err.to_string(), start);
        }

        let mut child = match Command::new(&self.config.interpreter)
            .arg(source.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                let (exit_code, category) = match err.kind() {
                    std::io::ErrorKind::NotFound => (127, ErrorCategory::FileNotFound),
                    std::io::ErrorKind::PermissionDenied => (1, ErrorCategory::PermissionDenied),
                    _ => (1, ErrorCategory::Unknown),
                };
                warn!(
                    interpreter = %self.config.interpreter.display(),
                    error = %err,
                    "Failed to spawn interpreter"
                );
                return infrastructure_failure(exit_code, category, &err.to_string(), start);
            }
        };

        let cap = self.config.max_output_bytes;
        let stdout_capture = StreamCapture::spawn(child.stdout.take(), cap);
        let stderr_capture = StreamCapture::spawn(child.stderr.take(), cap);

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code().unwrap_or(-1), false),
            Ok(Err(err)) => {
                warn!(error = %err, "Failed to wait on child process");
                (-1, false)
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Execution timed out, killing process");
                let _ = child.start_kill();
                if tokio::time::timeout(self.config.kill_grace, child.wait())
                    .await
                    .is_err()
                {
                    warn!("Child survived the kill grace period");
                }
                (-1, true)
            }
        };

        // After a kill, take the snapshot quickly; a normal exit closes the
        // pipes, so waiting for EOF within the grace period is safe there.
        let drain = if timed_out {
            KILLED_DRAIN_WINDOW
        } else {
            self.config.kill_grace
        };
        let (stdout, mut stderr) = tokio::join!(
            stdout_capture.collect(drain),
            stderr_capture.collect(drain),
        );

        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        if timed_out {
            if stderr.is_empty() {
                stderr = format!("process killed after timeout of {}s", timeout.as_secs());
            }
            return ExecutionOutcome {
                success: false,
                exit_code: -1,
                stdout,
                stderr,
                execution_time_ms,
                error_category: Some(ErrorCategory::Timeout),
            };
        }

        let success = exit_code == 0;
        let error_category = if success {
            None
        } else {
            Some(categorize_stderr(&stderr))
        };

        debug!(
            exit_code,
            success,
            execution_time_ms,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "Isolated execution finished"
        );

        ExecutionOutcome {
            success,
            exit_code,
            stdout,
            stderr,
            execution_time_ms,
            error_category,
        }
    }
}

/// Incremental capture of one child stream, capped at a byte ceiling.
///
/// Bytes land in a shared buffer as they arrive, so already-produced output
/// survives even when the pipe never reaches EOF.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R>(reader: Option<R>, cap: usize) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn({
            let buf = Arc::clone(&buf);
            async move {
                let Some(reader) = reader else { return };
                let mut limited = reader.take(cap as u64);
                let mut chunk = [0u8; 8192];
                loop {
                    match limited.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf.lock().await.extend_from_slice(&chunk[..n]),
                        Err(err) => {
                            debug!(error = %err, "Stream read ended early");
                            break;
                        }
                    }
                }
            }
        });
        Self { buf, task }
    }

    /// Waits up to `wait` for EOF, then returns whatever has accumulated.
    async fn collect(mut self, wait: Duration) -> String {
        if tokio::time::timeout(wait, &mut self.task).await.is_err() {
            self.task.abort();
        }
        let bytes = self.buf.lock().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Builds an outcome for a failure of the executor's own machinery.
fn infrastructure_failure(
    exit_code: i32,
    category: ErrorCategory,
    message: &str,
    start: Instant,
) -> ExecutionOutcome {
    ExecutionOutcome {
        success: false,
        exit_code,
        stdout: String::new(),
        stderr: message.to_string(),
        execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        error_category: Some(category),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_executor() -> IsolatedExecutor {
        IsolatedExecutor::new(IsolatedConfig::shell())
    }

    #[tokio::test]
    async fn test_successful_execution_captures_stdout() {
        let result = shell_executor().execute("echo hello").await;
        let outcome = result.outcome();
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.trim(), "hello");
        assert!(outcome.error_category.is_none());
        assert!(result.is_isolated());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_categorized() {
        let result = shell_executor().execute("echo oops >&2; exit 3").await;
        let outcome = result.outcome();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Execution));
        assert!(outcome.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let executor = shell_executor();
        let result = executor
            .execute_with_timeout("sleep 30", Duration::from_millis(200))
            .await;
        let outcome = result.outcome();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Timeout));
        // Killed and drained well before the sleep finished.
        assert!(outcome.execution_time_ms < 3_000.0);
    }

    #[tokio::test]
    async fn test_timeout_with_orphaned_grandchild_returns_promptly() {
        // The backgrounded sleep survives the interpreter kill and holds the
        // pipe write ends open, so capture must not wait for EOF.
        let start = std::time::Instant::now();
        let result = shell_executor()
            .execute_with_timeout("echo partial; sleep 30 & wait", Duration::from_millis(200))
            .await;
        let outcome = result.outcome();
        assert_eq!(outcome.error_category, Some(ErrorCategory::Timeout));
        assert!(outcome.stdout.contains("partial"));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_timeout_drains_partial_output() {
        let executor = shell_executor();
        let result = executor
            .execute_with_timeout("echo partial; sleep 30", Duration::from_millis(300))
            .await;
        let outcome = result.outcome();
        assert_eq!(outcome.error_category, Some(ErrorCategory::Timeout));
        assert!(outcome.stdout.contains("partial"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_reported_as_data() {
        let config = IsolatedConfig::new("/nonexistent/interpreter-xyz");
        let result = IsolatedExecutor::new(config).execute("echo hi").await;
        let outcome = result.outcome();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, 127);
        assert_eq!(outcome.error_category, Some(ErrorCategory::FileNotFound));
    }

    #[tokio::test]
    async fn test_output_cap_bounds_capture() {
        let config = IsolatedConfig::shell().with_max_output_bytes(64);
        let executor = IsolatedExecutor::new(config);
        let result = executor.execute("yes x | head -c 4096").await;
        assert!(result.outcome().stdout.len() <= 64);
    }

    #[test]
    fn test_config_builders() {
        let config = IsolatedConfig::new("bash")
            .with_timeout(Duration::from_secs(5))
            .with_source_suffix(".bash")
            .with_max_output_bytes(1024);
        assert_eq!(config.interpreter, PathBuf::from("bash"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.source_suffix, ".bash");
        assert_eq!(config.max_output_bytes, 1024);
    }
}
