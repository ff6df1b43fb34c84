//! Snippet executors and the shared raw-result model.
//!
//! Two executors produce raw results: the [`SimulatedExecutor`] classifies a
//! snippet heuristically without running it, and the [`IsolatedExecutor`]
//! runs it in a separate OS process under a wall-clock timeout. Both report
//! through the same [`RawExecutionResult`] tagged union so downstream code
//! can branch exhaustively without probing executor types.

pub mod isolated;
pub mod simulated;

use serde::{Deserialize, Serialize};

pub use isolated::{IsolatedConfig, IsolatedExecutor};
pub use simulated::{SimulatedExecutor, SimulationBehavior};

/// Maximum bytes of stdout or stderr captured per stream (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Classification of execution failures.
///
/// Covers both executor-level failures (timeout, spawn problems) and
/// target-code failures recognized from stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Execution exceeded the wall-clock timeout.
    Timeout,
    /// Permission denied while spawning or running.
    PermissionDenied,
    /// Interpreter or referenced file not found.
    FileNotFound,
    /// Missing module or import failure.
    MissingDependency,
    /// Syntax error in the snippet.
    Syntax,
    /// Runtime error (type/attribute failures and similar).
    Runtime,
    /// Out-of-memory condition.
    Memory,
    /// Input/output failure.
    Io,
    /// Broken interpreter environment (env lookup, missing files).
    Environment,
    /// Generic execution failure with no more specific signal.
    Execution,
    /// Failure that could not be classified at all.
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::FileNotFound => "file_not_found",
            ErrorCategory::MissingDependency => "missing_dependency",
            ErrorCategory::Syntax => "syntax_error",
            ErrorCategory::Runtime => "runtime_error",
            ErrorCategory::Memory => "memory_error",
            ErrorCategory::Io => "io_error",
            ErrorCategory::Environment => "environment_error",
            ErrorCategory::Execution => "execution_error",
            ErrorCategory::Unknown => "unknown_error",
        };
        write!(f, "{}", name)
    }
}

/// Captured outcome of a single execution, shared by both executor kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether execution completed successfully (exit code 0).
    pub success: bool,
    /// Process exit code (-1 on timeout).
    pub exit_code: i32,
    /// Captured standard output, bounded by the output cap.
    pub stdout: String,
    /// Captured standard error, bounded by the output cap.
    pub stderr: String,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: f64,
    /// Failure classification, `None` on success.
    pub error_category: Option<ErrorCategory>,
}

impl ExecutionOutcome {
    /// Total size of stdout + stderr in bytes.
    pub fn output_size(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }

    /// Returns true if either stream produced output.
    pub fn has_output(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty()
    }
}

/// Raw result of one executor run, tagged by the executor that produced it.
///
/// The two shapes are mutually exclusive by construction; consumers match on
/// the variant instead of inspecting flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "executor", rename_all = "snake_case")]
pub enum RawExecutionResult {
    /// Heuristic result produced without running the snippet.
    Simulated {
        outcome: ExecutionOutcome,
        /// Simulation behavior that produced this result.
        behavior: SimulationBehavior,
    },
    /// Result of a real child-process execution.
    Isolated { outcome: ExecutionOutcome },
}

impl RawExecutionResult {
    /// The captured outcome, independent of executor kind.
    pub fn outcome(&self) -> &ExecutionOutcome {
        match self {
            RawExecutionResult::Simulated { outcome, .. } => outcome,
            RawExecutionResult::Isolated { outcome } => outcome,
        }
    }

    /// True when this result came from a real child process.
    pub fn is_isolated(&self) -> bool {
        matches!(self, RawExecutionResult::Isolated { .. })
    }

    /// Shorthand for the outcome's success flag.
    pub fn success(&self) -> bool {
        self.outcome().success
    }
}

/// Classifies a failure from stderr text.
///
/// Priority-ordered substring checks, first match wins. Shared by the
/// isolated executor and the result classifier so both sides agree on
/// category names.
pub fn categorize_stderr(stderr: &str) -> ErrorCategory {
    let lower = stderr.to_lowercase();

    if lower.contains("modulenotfounderror") || lower.contains("importerror") {
        ErrorCategory::MissingDependency
    } else if lower.contains("syntaxerror") {
        ErrorCategory::Syntax
    } else if lower.contains("typeerror") || lower.contains("attributeerror") {
        ErrorCategory::Runtime
    } else if lower.contains("permission denied") {
        ErrorCategory::PermissionDenied
    } else if lower.contains("not found") || lower.contains("command not found") {
        ErrorCategory::FileNotFound
    } else if lower.starts_with("env:") || lower.contains("no such file") {
        ErrorCategory::Environment
    } else {
        ErrorCategory::Execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, stdout: &str, stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            success,
            exit_code: if success { 0 } else { 1 },
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            execution_time_ms: 1.0,
            error_category: None,
        }
    }

    #[test]
    fn test_categorize_stderr_priority_order() {
        // ImportError outranks the generic runtime check even when both match.
        assert_eq!(
            categorize_stderr("ImportError: TypeError while importing"),
            ErrorCategory::MissingDependency
        );
        assert_eq!(
            categorize_stderr("SyntaxError: invalid syntax"),
            ErrorCategory::Syntax
        );
        assert_eq!(
            categorize_stderr("TypeError: unsupported operand"),
            ErrorCategory::Runtime
        );
        assert_eq!(
            categorize_stderr("bash: permission denied"),
            ErrorCategory::PermissionDenied
        );
        assert_eq!(
            categorize_stderr("frobnicate: command not found"),
            ErrorCategory::FileNotFound
        );
        assert_eq!(
            categorize_stderr("env: python4: No such file or directory"),
            ErrorCategory::Environment
        );
        assert_eq!(
            categorize_stderr("something exploded"),
            ErrorCategory::Execution
        );
    }

    #[test]
    fn test_outcome_output_size() {
        let o = outcome(true, "abc", "de");
        assert_eq!(o.output_size(), 5);
        assert!(o.has_output());
        assert!(!outcome(true, "", "").has_output());
    }

    #[test]
    fn test_raw_result_accessors() {
        let sim = RawExecutionResult::Simulated {
            outcome: outcome(true, "ok", ""),
            behavior: SimulationBehavior::Heuristic,
        };
        assert!(!sim.is_isolated());
        assert!(sim.success());

        let iso = RawExecutionResult::Isolated {
            outcome: outcome(false, "", "boom"),
        };
        assert!(iso.is_isolated());
        assert!(!iso.success());
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::MissingDependency.to_string(), "missing_dependency");
        assert_eq!(ErrorCategory::Timeout.to_string(), "timeout");
    }
}
