//! Rolling execution statistics consumed by the optimization advisor.

use std::collections::HashMap;

use crate::classifier::{EnhancedResult, ResultCategory};
use crate::executor::ErrorCategory;

/// Accumulates per-execution observations across a pipeline session.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    timings: Vec<f64>,
    successes: usize,
    timeouts: usize,
    agreements: usize,
    disagreements: usize,
    error_categories: HashMap<ErrorCategory, usize>,
}

impl ExecutionStats {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one classified result.
    pub fn record(&mut self, result: &EnhancedResult) {
        self.timings.push(result.metadata.execution_time_ms);

        if result.orchestrated.success() {
            self.successes += 1;
        }
        if result.category == ResultCategory::Timeout {
            self.timeouts += 1;
        }
        match result.orchestrated.agreement() {
            Some(true) => self.agreements += 1,
            Some(false) => self.disagreements += 1,
            None => {}
        }
        if let Some(category) = result.metadata.error_type {
            *self.error_categories.entry(category).or_insert(0) += 1;
        }
    }

    /// Number of recorded executions.
    pub fn len(&self) -> usize {
        self.timings.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Fraction of executions whose authoritative result succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.timings.is_empty() {
            return 0.0;
        }
        self.successes as f64 / self.timings.len() as f64
    }

    /// Fraction of executions classified as timeouts.
    pub fn timeout_rate(&self) -> f64 {
        if self.timings.is_empty() {
            return 0.0;
        }
        self.timeouts as f64 / self.timings.len() as f64
    }

    /// Agreement rate over dual-executor runs, `None` before any dual run.
    pub fn agreement_rate(&self) -> Option<f64> {
        let dual = self.agreements + self.disagreements;
        (dual > 0).then(|| self.agreements as f64 / dual as f64)
    }

    /// Most frequent error category, with its count.
    pub fn most_common_error(&self) -> Option<(ErrorCategory, usize)> {
        self.error_categories
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(category, count)| (*category, *count))
    }

    /// Raw execution timings in recording order.
    pub fn timings(&self) -> &[f64] {
        &self.timings
    }

    /// Resets all counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ResultClassifier;
    use crate::executor::{ExecutionOutcome, RawExecutionResult};
    use crate::orchestrator::{ExecutionMode, OrchestratedResult, RoutingDecision};

    fn classified(exit_code: i32, stderr: &str, time_ms: f64) -> EnhancedResult {
        ResultClassifier::new().process(OrchestratedResult {
            primary: RawExecutionResult::Isolated {
                outcome: ExecutionOutcome {
                    success: exit_code == 0,
                    exit_code,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    execution_time_ms: time_ms,
                    error_category: None,
                },
            },
            secondary: None,
            decision: RoutingDecision {
                mode: ExecutionMode::IsolatedOnly,
                confidence: 0.9,
                reason: "test".to_string(),
            },
        })
    }

    #[test]
    fn test_rates_over_mixed_results() {
        let mut stats = ExecutionStats::new();
        stats.record(&classified(0, "", 10.0));
        stats.record(&classified(0, "", 20.0));
        stats.record(&classified(1, "SyntaxError: bad", 5.0));
        stats.record(&classified(1, "ImportError: no module", 5.0));

        assert_eq!(stats.len(), 4);
        assert!((stats.success_rate() - 0.5).abs() < 1e-9);
        assert_eq!(stats.timeout_rate(), 0.0);
        assert_eq!(stats.agreement_rate(), None);
        assert_eq!(stats.timings().len(), 4);
    }

    #[test]
    fn test_most_common_error() {
        let mut stats = ExecutionStats::new();
        stats.record(&classified(1, "SyntaxError: a", 1.0));
        stats.record(&classified(1, "SyntaxError: b", 1.0));
        stats.record(&classified(1, "ImportError: c", 1.0));

        let (category, count) = stats.most_common_error().expect("errors recorded");
        assert_eq!(category, ErrorCategory::Syntax);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ExecutionStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.timeout_rate(), 0.0);
        assert!(stats.most_common_error().is_none());
    }

    #[test]
    fn test_clear() {
        let mut stats = ExecutionStats::new();
        stats.record(&classified(0, "", 10.0));
        stats.clear();
        assert!(stats.is_empty());
    }
}
