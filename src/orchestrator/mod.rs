//! Execution orchestrator: confidence-based routing between executors.
//!
//! The orchestrator is a three-state routing machine over an externally
//! supplied confidence score:
//!
//! - above the high threshold (default 0.8): isolated execution only
//! - below the low threshold (default 0.5): simulated validation only
//! - in between: run both, simulated first, and record whether the two
//!   success verdicts agree
//!
//! When both executors run, the isolated result is authoritative; the
//! simulated result is retained only for the agreement statistic.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::executor::{IsolatedExecutor, RawExecutionResult, SimulatedExecutor};

/// Default threshold above which only the isolated executor runs.
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Default threshold below which only the simulated executor runs.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Routing mode chosen for an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Simulated validation only, no real execution.
    SimulatedOnly,
    /// Real execution only, treated as production-ready.
    IsolatedOnly,
    /// Both executors, with agreement tracking.
    Both,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionMode::SimulatedOnly => "simulated_only",
            ExecutionMode::IsolatedOnly => "isolated_only",
            ExecutionMode::Both => "both",
        };
        write!(f, "{}", name)
    }
}

/// Routing decision for one execution. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Chosen execution mode.
    pub mode: ExecutionMode,
    /// Clamped confidence value that produced the decision.
    pub confidence: f64,
    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Result of an orchestrated execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratedResult {
    /// Authoritative result (isolated when both executors ran).
    pub primary: RawExecutionResult,
    /// Simulated result, present only in [`ExecutionMode::Both`].
    pub secondary: Option<RawExecutionResult>,
    /// The routing decision that produced this result.
    pub decision: RoutingDecision,
}

impl OrchestratedResult {
    /// Overall success, taken from the authoritative result.
    pub fn success(&self) -> bool {
        self.primary.success()
    }

    /// The mode this execution was routed to.
    pub fn mode(&self) -> ExecutionMode {
        self.decision.mode
    }

    /// The clamped confidence used for routing.
    pub fn confidence(&self) -> f64 {
        self.decision.confidence
    }

    /// Whether the two executors agreed on success, when both ran.
    pub fn agreement(&self) -> Option<bool> {
        self.secondary
            .as_ref()
            .map(|secondary| secondary.success() == self.primary.success())
    }
}

/// Running counters for orchestrated executions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrchestratorStats {
    /// Total executions routed.
    pub total: u64,
    /// Executions routed to simulation only.
    pub simulated_only: u64,
    /// Executions routed to isolation only.
    pub isolated_only: u64,
    /// Executions that ran both executors.
    pub both: u64,
    /// Dual runs where both executors agreed on success.
    pub agreements: u64,
    /// Dual runs where the executors disagreed.
    pub disagreements: u64,
}

impl OrchestratorStats {
    /// Agreement rate over dual runs, `None` before any dual run.
    pub fn agreement_rate(&self) -> Option<f64> {
        let dual = self.agreements + self.disagreements;
        (dual > 0).then(|| self.agreements as f64 / dual as f64)
    }
}

/// Routes executions between the simulated and isolated executors.
pub struct ExecutionOrchestrator {
    simulated: SimulatedExecutor,
    isolated: IsolatedExecutor,
    high_confidence_threshold: f64,
    low_confidence_threshold: f64,
    stats: OrchestratorStats,
}

impl ExecutionOrchestrator {
    /// Creates an orchestrator with default thresholds.
    pub fn new(simulated: SimulatedExecutor, isolated: IsolatedExecutor) -> Self {
        Self::with_thresholds(
            simulated,
            isolated,
            DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        )
    }

    /// Creates an orchestrator with explicit thresholds.
    pub fn with_thresholds(
        simulated: SimulatedExecutor,
        isolated: IsolatedExecutor,
        high_confidence_threshold: f64,
        low_confidence_threshold: f64,
    ) -> Self {
        Self {
            simulated,
            isolated,
            high_confidence_threshold,
            low_confidence_threshold,
            stats: OrchestratorStats::default(),
        }
    }

    /// Executes a snippet with confidence-based routing.
    pub async fn execute(
        &mut self,
        code: &str,
        confidence: f64,
        timeout: Duration,
    ) -> OrchestratedResult {
        let decision = self.route(code, confidence);
        self.stats.total += 1;

        info!(
            mode = %decision.mode,
            confidence = decision.confidence,
            code_len = code.len(),
            "Routing execution"
        );

        match decision.mode {
            ExecutionMode::IsolatedOnly => {
                self.stats.isolated_only += 1;
                let primary = self.isolated.execute_with_timeout(code, timeout).await;
                OrchestratedResult {
                    primary,
                    secondary: None,
                    decision,
                }
            }
            ExecutionMode::SimulatedOnly => {
                self.stats.simulated_only += 1;
                let primary = self.simulated.execute(code);
                OrchestratedResult {
                    primary,
                    secondary: None,
                    decision,
                }
            }
            ExecutionMode::Both => {
                self.stats.both += 1;
                // Simulated runs first, then isolated, never in parallel.
                let simulated = self.simulated.execute(code);
                let isolated = self.isolated.execute_with_timeout(code, timeout).await;

                if simulated.success() == isolated.success() {
                    self.stats.agreements += 1;
                } else {
                    self.stats.disagreements += 1;
                    debug!(
                        simulated_success = simulated.success(),
                        isolated_success = isolated.success(),
                        "Executor disagreement"
                    );
                }

                OrchestratedResult {
                    primary: isolated,
                    secondary: Some(simulated),
                    decision,
                }
            }
        }
    }

    /// Makes the routing decision for a confidence score.
    ///
    /// Confidence is clamped to `[0, 1]` first, so out-of-range inputs route
    /// the same way as their clamped counterparts.
    pub fn route(&self, code: &str, confidence: f64) -> RoutingDecision {
        let confidence = confidence.clamp(0.0, 1.0);

        let (mode, reason) = if confidence > self.high_confidence_threshold {
            (
                ExecutionMode::IsolatedOnly,
                format!("High confidence ({:.2}) - isolated execution only", confidence),
            )
        } else if confidence < self.low_confidence_threshold {
            (
                ExecutionMode::SimulatedOnly,
                format!("Low confidence ({:.2}) - simulated validation only", confidence),
            )
        } else {
            (
                ExecutionMode::Both,
                format!(
                    "Medium confidence ({:.2}) - run both executors and compare ({} chars)",
                    confidence,
                    code.len()
                ),
            )
        };

        RoutingDecision {
            mode,
            confidence,
            reason,
        }
    }

    /// Snapshot of the routing counters.
    pub fn stats(&self) -> OrchestratorStats {
        self.stats
    }

    /// Resets the routing counters.
    pub fn reset_stats(&mut self) {
        self.stats = OrchestratorStats::default();
    }

    /// Adjusts the routing thresholds; `None` leaves a threshold unchanged.
    pub fn set_thresholds(&mut self, high: Option<f64>, low: Option<f64>) {
        if let Some(high) = high {
            self.high_confidence_threshold = high;
        }
        if let Some(low) = low {
            self.low_confidence_threshold = low;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{IsolatedConfig, SimulationBehavior};

    fn orchestrator() -> ExecutionOrchestrator {
        ExecutionOrchestrator::new(
            SimulatedExecutor::with_seed(SimulationBehavior::Heuristic, 11),
            IsolatedExecutor::new(IsolatedConfig::shell()),
        )
    }

    #[test]
    fn test_routing_thresholds() {
        let orch = orchestrator();
        assert_eq!(orch.route("x", 0.9).mode, ExecutionMode::IsolatedOnly);
        assert_eq!(orch.route("x", 0.3).mode, ExecutionMode::SimulatedOnly);
        assert_eq!(orch.route("x", 0.65).mode, ExecutionMode::Both);
        // Boundary values are not strictly above/below, so both run.
        assert_eq!(orch.route("x", 0.8).mode, ExecutionMode::Both);
        assert_eq!(orch.route("x", 0.5).mode, ExecutionMode::Both);
    }

    #[test]
    fn test_routing_clamps_confidence() {
        let orch = orchestrator();
        let below = orch.route("x", -5.0);
        let zero = orch.route("x", 0.0);
        assert_eq!(below.mode, zero.mode);
        assert_eq!(below.confidence, 0.0);

        let above = orch.route("x", 42.0);
        assert_eq!(above.mode, ExecutionMode::IsolatedOnly);
        assert_eq!(above.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_isolated_only_execution() {
        let mut orch = orchestrator();
        let result = orch
            .execute("echo hi", 0.95, Duration::from_secs(10))
            .await;
        assert_eq!(result.mode(), ExecutionMode::IsolatedOnly);
        assert!(result.success());
        assert!(result.secondary.is_none());
        assert!(result.agreement().is_none());
        assert_eq!(orch.stats().isolated_only, 1);
    }

    #[tokio::test]
    async fn test_simulated_only_execution_runs_no_process() {
        let mut orch = orchestrator();
        let result = orch
            .execute("echo hi", 0.1, Duration::from_secs(10))
            .await;
        assert_eq!(result.mode(), ExecutionMode::SimulatedOnly);
        assert!(!result.primary.is_isolated());
        assert_eq!(orch.stats().simulated_only, 1);
    }

    #[tokio::test]
    async fn test_both_mode_tracks_agreement() {
        // Force simulated failure against a succeeding shell snippet.
        let mut orch = ExecutionOrchestrator::new(
            SimulatedExecutor::with_seed(SimulationBehavior::AlwaysFailure, 1),
            IsolatedExecutor::new(IsolatedConfig::shell()),
        );
        let result = orch
            .execute("echo ok", 0.65, Duration::from_secs(10))
            .await;

        assert_eq!(result.mode(), ExecutionMode::Both);
        assert_eq!(result.agreement(), Some(false));
        // The isolated result is authoritative.
        assert!(result.success());
        assert!(result.primary.is_isolated());
        assert_eq!(orch.stats().disagreements, 1);
        assert_eq!(orch.stats().agreement_rate(), Some(0.0));
    }

    #[tokio::test]
    async fn test_stats_accumulate_and_reset() {
        let mut orch = orchestrator();
        orch.execute("echo a", 0.9, Duration::from_secs(5)).await;
        orch.execute("echo b", 0.1, Duration::from_secs(5)).await;
        assert_eq!(orch.stats().total, 2);

        orch.reset_stats();
        assert_eq!(orch.stats().total, 0);
    }

    #[test]
    fn test_set_thresholds() {
        let mut orch = orchestrator();
        orch.set_thresholds(Some(0.6), None);
        assert_eq!(orch.route("x", 0.7).mode, ExecutionMode::IsolatedOnly);
    }
}
