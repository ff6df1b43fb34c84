//! Result classifier: categorization and metadata extraction.
//!
//! Turns an [`OrchestratedResult`] into an [`EnhancedResult`] by unifying the
//! two raw-result shapes into one metadata record, classifying the error,
//! deriving a canonical category, and deciding cacheability. Downstream code
//! never branches on executor type again after this point.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::executor::{ErrorCategory, RawExecutionResult};
use crate::orchestrator::{ExecutionMode, OrchestratedResult};

const TIMEOUT_KEYWORDS: &[&str] = &["timeout", "timed out", "deadline exceeded", "killed"];
const PERMISSION_KEYWORDS: &[&str] = &["permission denied", "access denied", "unauthorized"];
const DEPENDENCY_KEYWORDS: &[&str] =
    &["importerror", "modulenotfounderror", "no module", "cannot import"];
const SYNTAX_KEYWORDS: &[&str] = &["syntaxerror", "invalid syntax", "unexpected"];
const MEMORY_KEYWORDS: &[&str] = &["memoryerror", "out of memory", "heap space"];

/// Canonical category of an execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCategory {
    /// Exit code 0.
    Success,
    /// Non-zero exit but some output was produced.
    PartialSuccess,
    /// Failed with no more specific classification.
    Failure,
    /// Wall-clock timeout.
    Timeout,
    /// Fatal, classifiable error (syntax, memory, dependency) with no output.
    Error,
}

impl std::fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultCategory::Success => "success",
            ResultCategory::PartialSuccess => "partial_success",
            ResultCategory::Failure => "failure",
            ResultCategory::Timeout => "timeout",
            ResultCategory::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Metadata extracted from an orchestrated result.
///
/// One record for both executor kinds; `is_real_execution` is the only
/// remaining trace of which executor produced the primary result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: f64,
    /// Total output size in bytes.
    pub output_size_bytes: usize,
    /// Length of stdout in bytes.
    pub stdout_length: usize,
    /// Length of stderr in bytes.
    pub stderr_length: usize,
    /// Process exit code.
    pub exit_code: i32,
    /// Classified error type, `None` on success.
    pub error_type: Option<ErrorCategory>,
    /// Whether stderr was non-empty.
    pub has_stderr: bool,
    /// Whether the execution timed out.
    pub is_timeout: bool,
    /// Whether the primary result came from a real child process.
    pub is_real_execution: bool,
    /// Confidence score used for routing.
    pub confidence_score: f64,
    /// Execution mode used.
    pub execution_mode: ExecutionMode,
}

/// Orchestrated result enriched with category, metadata and cacheability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedResult {
    /// The underlying orchestrated result.
    pub orchestrated: OrchestratedResult,
    /// Canonical result category.
    pub category: ResultCategory,
    /// Extracted metadata.
    pub metadata: ResultMetadata,
    /// Whether this result is safe to memoize.
    pub is_cacheable: bool,
    /// One-line human-readable summary.
    pub summary: String,
    /// Primary output (stdout, falling back to stderr), if any.
    pub primary_output: Option<String>,
}

impl EnhancedResult {
    /// True only for the `Success` category.
    pub fn is_successful(&self) -> bool {
        self.category == ResultCategory::Success
    }
}

/// Classifies orchestrated results into enhanced results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    /// Creates a classifier.
    pub fn new() -> Self {
        Self
    }

    /// Processes one orchestrated result.
    pub fn process(&self, result: OrchestratedResult) -> EnhancedResult {
        let metadata = self.extract_metadata(&result);
        let category = categorize(&metadata);
        let is_cacheable = is_cacheable(category);
        let primary_output = extract_output(&result.primary);
        let summary = summarize(category, &metadata, &result);

        debug!(
            category = %category,
            is_cacheable,
            exit_code = metadata.exit_code,
            "Classified execution result"
        );

        EnhancedResult {
            orchestrated: result,
            category,
            metadata,
            is_cacheable,
            summary,
            primary_output,
        }
    }

    /// Processes a batch of orchestrated results in order.
    pub fn process_batch(&self, results: Vec<OrchestratedResult>) -> Vec<EnhancedResult> {
        results.into_iter().map(|r| self.process(r)).collect()
    }

    fn extract_metadata(&self, result: &OrchestratedResult) -> ResultMetadata {
        let outcome = result.primary.outcome();

        // Simulated failures surface their message on whichever stream is
        // populated, so they fall back to stdout when stderr is empty. Real
        // executions classify from stderr alone; their stdout is program
        // output, not an error channel.
        let error_output = match &result.primary {
            RawExecutionResult::Simulated { .. } if outcome.stderr.is_empty() => &outcome.stdout,
            _ => &outcome.stderr,
        };

        // An executor-tagged timeout is authoritative. Otherwise scan the
        // output text; a silent failure keeps whatever tag the executor set.
        let error_type = if outcome.error_category == Some(ErrorCategory::Timeout) {
            Some(ErrorCategory::Timeout)
        } else if !error_output.is_empty() {
            self.classify_error(error_output, outcome.exit_code)
        } else if outcome.exit_code != 0 {
            outcome.error_category.or(Some(ErrorCategory::Runtime))
        } else {
            None
        };

        ResultMetadata {
            execution_time_ms: outcome.execution_time_ms,
            output_size_bytes: outcome.output_size(),
            stdout_length: outcome.stdout.len(),
            stderr_length: outcome.stderr.len(),
            exit_code: outcome.exit_code,
            error_type,
            has_stderr: !outcome.stderr.is_empty(),
            is_timeout: error_type == Some(ErrorCategory::Timeout),
            is_real_execution: result.primary.is_isolated(),
            confidence_score: result.confidence(),
            execution_mode: result.mode(),
        }
    }

    /// Classifies an error from output text and exit code.
    ///
    /// Priority-ordered keyword scan generalized over both executor kinds;
    /// first match wins, non-zero exits default to `Runtime`.
    fn classify_error(&self, output: &str, exit_code: i32) -> Option<ErrorCategory> {
        if exit_code == 0 {
            return None;
        }

        let lower = output.to_lowercase();

        if TIMEOUT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ErrorCategory::Timeout);
        }
        if PERMISSION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ErrorCategory::PermissionDenied);
        }
        if DEPENDENCY_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ErrorCategory::MissingDependency);
        }
        if SYNTAX_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ErrorCategory::Syntax);
        }
        if MEMORY_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ErrorCategory::Memory);
        }
        if (lower.contains("io") || lower.contains("file")) && lower.contains("error") {
            return Some(ErrorCategory::Io);
        }

        Some(ErrorCategory::Runtime)
    }
}

/// Decision table from metadata to category.
fn categorize(metadata: &ResultMetadata) -> ResultCategory {
    if metadata.is_timeout {
        return ResultCategory::Timeout;
    }
    if metadata.exit_code == 0 {
        return ResultCategory::Success;
    }
    if metadata.stdout_length > 0 || metadata.stderr_length > 0 {
        return ResultCategory::PartialSuccess;
    }
    if matches!(
        metadata.error_type,
        Some(ErrorCategory::Syntax | ErrorCategory::Memory | ErrorCategory::MissingDependency)
    ) {
        return ResultCategory::Error;
    }
    ResultCategory::Failure
}

/// Transient categories are never cached; they may change on retry.
fn is_cacheable(category: ResultCategory) -> bool {
    matches!(
        category,
        ResultCategory::Success | ResultCategory::PartialSuccess
    )
}

fn extract_output(primary: &RawExecutionResult) -> Option<String> {
    let outcome = primary.outcome();
    if !outcome.stdout.is_empty() {
        Some(outcome.stdout.clone())
    } else if !outcome.stderr.is_empty() {
        Some(outcome.stderr.clone())
    } else {
        None
    }
}

fn summarize(
    category: ResultCategory,
    metadata: &ResultMetadata,
    result: &OrchestratedResult,
) -> String {
    let mut parts = vec![format!("Status: {}", category)];

    if metadata.exit_code != 0 {
        parts.push(format!("Exit code: {}", metadata.exit_code));
    }
    if let Some(error_type) = metadata.error_type {
        parts.push(format!("Error: {}", error_type));
    }
    parts.push(format!("Time: {:.0}ms", metadata.execution_time_ms));
    parts.push(format!("Output: {} bytes", metadata.output_size_bytes));
    parts.push(format!("Mode: {}", metadata.execution_mode));
    if let Some(agreement) = result.agreement() {
        parts.push(format!("Agreement: {}", agreement));
    }

    parts.join(" | ")
}
