//! Optimization advisor: pattern analysis over recorded executions.
//!
//! Consumes [`ExecutionStats`] and turns observed rates and timing trends
//! into prioritized strategy recommendations. Analysis requires a minimum
//! sample count; below it the advisor stays silent rather than guessing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RecommendationError;
use crate::executor::ErrorCategory;
use crate::stats::ExecutionStats;

/// Samples required before pattern analysis runs.
pub const MIN_ANALYSIS_SAMPLES: usize = 5;

/// Coefficient of variation above which timings count as volatile.
pub const VOLATILITY_THRESHOLD: f64 = 0.3;

/// High-level optimization strategies the advisor can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    /// Cache everything cacheable with long TTLs.
    CacheAggressive,
    /// Default caching posture.
    CacheConservative,
    /// Route all executions to the isolated executor.
    RoutingIsolatedOnly,
    /// Break large snippets into smaller units.
    SplitExecution,
    /// Invest in profiling before optimizing further.
    ProfileHeavy,
    /// Retry transient failures automatically.
    RetryAggressive,
}

impl std::fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizationStrategy::CacheAggressive => "cache_aggressive",
            OptimizationStrategy::CacheConservative => "cache_conservative",
            OptimizationStrategy::RoutingIsolatedOnly => "routing_isolated_only",
            OptimizationStrategy::SplitExecution => "split_execution",
            OptimizationStrategy::ProfileHeavy => "profile_heavy",
            OptimizationStrategy::RetryAggressive => "retry_aggressive",
        };
        write!(f, "{}", name)
    }
}

/// Direction of the execution-time trend across a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingTrend {
    Improving,
    Degrading,
    Stable,
}

/// Aggregate patterns extracted from execution statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Number of executions behind the analysis.
    pub sample_count: usize,
    /// Fraction of successful executions.
    pub success_rate: f64,
    /// Fraction of executions that timed out.
    pub timeout_rate: f64,
    /// Fraction of executions that failed, `1 - success_rate`.
    pub error_rate: f64,
    /// Agreement rate over dual runs, when any occurred.
    pub agreement_rate: Option<f64>,
    /// Mean execution time.
    pub avg_time_ms: f64,
    /// Coefficient of variation of timings (stddev over mean).
    pub volatility: f64,
    /// Timing trend between the start and end of the session.
    pub trend: TimingTrend,
    /// Most frequent error category, if any errors occurred.
    pub most_common_error: Option<(ErrorCategory, usize)>,
}

/// A strategy recommendation with validated confidence and priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecommendation {
    /// Recommended strategy.
    pub strategy: OptimizationStrategy,
    /// What to do.
    pub description: String,
    /// What the strategy is expected to buy.
    pub expected_benefit: String,
    /// Confidence in the recommendation, `[0, 1]`.
    pub confidence: f64,
    /// Which observed pattern triggered it.
    pub reason: String,
    /// Priority, 1 (highest) to 10 (lowest).
    pub priority: u8,
}

impl OptimizationRecommendation {
    /// Creates a recommendation, rejecting out-of-range fields.
    pub fn new(
        strategy: OptimizationStrategy,
        description: impl Into<String>,
        expected_benefit: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        priority: u8,
    ) -> Result<Self, RecommendationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecommendationError::ConfidenceOutOfRange(confidence));
        }
        if !(1..=10).contains(&priority) {
            return Err(RecommendationError::PriorityOutOfRange {
                value: priority,
                min: 1,
                max: 10,
            });
        }
        Ok(Self {
            strategy,
            description: description.into(),
            expected_benefit: expected_benefit.into(),
            confidence,
            reason: reason.into(),
            priority,
        })
    }
}

/// Analyzes execution patterns and generates strategy recommendations.
pub struct OptimizationAdvisor {
    min_samples: usize,
    volatility_threshold: f64,
}

impl OptimizationAdvisor {
    /// Creates an advisor with default thresholds.
    pub fn new() -> Self {
        Self {
            min_samples: MIN_ANALYSIS_SAMPLES,
            volatility_threshold: VOLATILITY_THRESHOLD,
        }
    }

    /// Creates an advisor with an explicit sample floor.
    pub fn with_min_samples(min_samples: usize) -> Self {
        Self {
            min_samples,
            ..Self::new()
        }
    }

    /// Extracts patterns from stats, or `None` below the sample floor.
    pub fn analyze_patterns(&self, stats: &ExecutionStats) -> Option<PatternAnalysis> {
        let timings = stats.timings();
        if timings.len() < self.min_samples {
            debug!(
                samples = timings.len(),
                required = self.min_samples,
                "Not enough samples for pattern analysis"
            );
            return None;
        }

        let avg = timings.iter().sum::<f64>() / timings.len() as f64;
        let variance =
            timings.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / timings.len() as f64;
        let volatility = if avg > 0.0 { variance.sqrt() / avg } else { 0.0 };

        let success_rate = stats.success_rate();

        Some(PatternAnalysis {
            sample_count: timings.len(),
            success_rate,
            timeout_rate: stats.timeout_rate(),
            error_rate: 1.0 - success_rate,
            agreement_rate: stats.agreement_rate(),
            avg_time_ms: avg,
            volatility,
            trend: detect_trend(timings),
            most_common_error: stats.most_common_error(),
        })
    }

    /// Generates recommendations for an analysis, sorted by priority.
    ///
    /// The conservative-caching baseline always fires so callers never get
    /// an empty list from a valid analysis.
    pub fn generate_recommendations(
        &self,
        analysis: &PatternAnalysis,
    ) -> Vec<OptimizationRecommendation> {
        let mut recommendations = Vec::new();

        if analysis.timeout_rate > 0.3 {
            recommendations.push(rule(
                OptimizationStrategy::CacheAggressive,
                "Cache all successful results with extended TTLs",
                "Avoids repeating executions that frequently time out",
                0.85,
                format!("Timeout rate {:.0}% exceeds 30%", analysis.timeout_rate * 100.0),
                1,
            ));
        }

        if analysis.success_rate > 0.9
            && analysis.agreement_rate.is_some_and(|rate| rate > 0.95)
        {
            recommendations.push(rule(
                OptimizationStrategy::RoutingIsolatedOnly,
                "Skip simulated validation and route straight to isolation",
                "Removes redundant simulated runs from dual executions",
                0.9,
                format!(
                    "Success rate {:.0}% with executor agreement above 95%",
                    analysis.success_rate * 100.0
                ),
                2,
            ));
        }

        if analysis.volatility > self.volatility_threshold {
            recommendations.push(rule(
                OptimizationStrategy::ProfileHeavy,
                "Collect more timing samples before further optimization",
                "Stabilizes predictions for volatile workloads",
                0.75,
                format!("Timing volatility {:.2} exceeds {:.2}", analysis.volatility, self.volatility_threshold),
                3,
            ));
        }

        if analysis.trend == TimingTrend::Degrading {
            recommendations.push(rule(
                OptimizationStrategy::SplitExecution,
                "Split large snippets into smaller execution units",
                "Counters the observed execution-time regression",
                0.7,
                "Execution times are trending upward across the session",
                4,
            ));
        }

        if analysis.error_rate > 0.2 && analysis.error_rate < 0.5 {
            recommendations.push(rule(
                OptimizationStrategy::RetryAggressive,
                "Retry failed executions before reporting them",
                "Recovers the moderate share of likely-transient failures",
                0.65,
                format!("Error rate {:.0}% is moderate", analysis.error_rate * 100.0),
                5,
            ));
        }

        recommendations.push(rule(
            OptimizationStrategy::CacheConservative,
            "Keep caching successful results with default TTLs",
            "Baseline savings on repeated snippets",
            0.95,
            "Applies to every workload",
            10,
        ));

        recommendations.sort_by_key(|rec| rec.priority);
        recommendations
    }

    /// Analyzes and recommends in one step.
    pub fn advise(&self, stats: &ExecutionStats) -> Vec<OptimizationRecommendation> {
        self.analyze_patterns(stats)
            .map(|analysis| self.generate_recommendations(&analysis))
            .unwrap_or_default()
    }
}

impl Default for OptimizationAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

// Rule parameters are compile-time constants within validated ranges.
fn rule(
    strategy: OptimizationStrategy,
    description: &str,
    expected_benefit: &str,
    confidence: f64,
    reason: impl Into<String>,
    priority: u8,
) -> OptimizationRecommendation {
    OptimizationRecommendation {
        strategy,
        description: description.to_string(),
        expected_benefit: expected_benefit.to_string(),
        confidence,
        reason: reason.into(),
        priority,
    }
}

/// Compares the first two and last two timings; a 10% shift either way
/// marks the trend, anything closer is stable.
fn detect_trend(timings: &[f64]) -> TimingTrend {
    if timings.len() < 4 {
        return TimingTrend::Stable;
    }

    let early = (timings[0] + timings[1]) / 2.0;
    let late = (timings[timings.len() - 2] + timings[timings.len() - 1]) / 2.0;

    if early <= 0.0 {
        return TimingTrend::Stable;
    }
    if late >= early * 1.1 {
        TimingTrend::Degrading
    } else if late <= early * 0.9 {
        TimingTrend::Improving
    } else {
        TimingTrend::Stable
    }
}
