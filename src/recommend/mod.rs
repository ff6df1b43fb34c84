//! Recommendation synthesizer: per-snippet, actionable recommendations.
//!
//! Combines a performance prediction, an optional strategy recommendation
//! from the advisor, and the snippet's classified result into concrete
//! suggestions with estimated savings. Output is sorted by priority, then
//! confidence, both descending.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::advisor::{OptimizationRecommendation, OptimizationStrategy};
use crate::classifier::{EnhancedResult, ResultCategory};
use crate::error::RecommendationError;
use crate::executor::ErrorCategory;
use crate::profiler::PerformancePrediction;

/// Predicted time above which splitting a snippet is worth suggesting.
const SPLIT_TIME_THRESHOLD_MS: f64 = 100.0;

/// Prediction spread above which more profiling is suggested.
const PROFILE_SPREAD_THRESHOLD_MS: f64 = 100.0;

/// Minimum confidence for a synthesized recommendation to be emitted.
const EMIT_CONFIDENCE_FLOOR: f64 = 0.5;

/// Kind of action a recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Rely on the memoization cache for this snippet.
    Cache,
    /// Split the snippet into smaller units.
    Split,
    /// Gather more profiling data first.
    Profile,
    /// Apply a session-level optimization strategy.
    Optimize,
    /// Retry the execution.
    Retry,
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecommendationKind::Cache => "cache",
            RecommendationKind::Split => "split",
            RecommendationKind::Profile => "profile",
            RecommendationKind::Optimize => "optimize",
            RecommendationKind::Retry => "retry",
        };
        write!(f, "{}", name)
    }
}

/// Rough implementation effort for acting on a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// A concrete, per-snippet recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRecommendation {
    /// Kind of action proposed.
    pub kind: RecommendationKind,
    /// What to do.
    pub description: String,
    /// Estimated time saved per execution, in milliseconds.
    pub expected_savings_ms: f64,
    /// Confidence in the recommendation, `[0, 1]`.
    pub confidence: f64,
    /// Priority, 5 (highest) to 1 (lowest).
    pub priority: u8,
    /// Rough effort to act on it.
    pub effort: Effort,
    /// Which signal produced it.
    pub reason: String,
}

impl CodeRecommendation {
    /// Creates a recommendation, rejecting out-of-range fields.
    pub fn new(
        kind: RecommendationKind,
        description: impl Into<String>,
        expected_savings_ms: f64,
        confidence: f64,
        priority: u8,
        effort: Effort,
        reason: impl Into<String>,
    ) -> Result<Self, RecommendationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecommendationError::ConfidenceOutOfRange(confidence));
        }
        if !(1..=5).contains(&priority) {
            return Err(RecommendationError::PriorityOutOfRange {
                value: priority,
                min: 1,
                max: 5,
            });
        }
        if expected_savings_ms < 0.0 {
            return Err(RecommendationError::NegativeSavings(expected_savings_ms));
        }
        Ok(Self {
            kind,
            description: description.into(),
            expected_savings_ms,
            confidence,
            priority,
            effort,
            reason: reason.into(),
        })
    }
}

/// Synthesizes per-snippet recommendations from pipeline signals.
#[derive(Debug, Default)]
pub struct RecommendationSynthesizer;

impl RecommendationSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Produces recommendations for one execution.
    pub fn synthesize(
        &self,
        prediction: &PerformancePrediction,
        strategy: Option<&OptimizationRecommendation>,
        result: &EnhancedResult,
    ) -> Vec<CodeRecommendation> {
        let mut recommendations = Vec::new();

        if let Some(rec) = self.cache_recommendation(prediction, strategy, result) {
            recommendations.push(rec);
        }
        if let Some(rec) = self.split_recommendation(prediction, result) {
            recommendations.push(rec);
        }
        if let Some(rec) = self.profile_recommendation(prediction) {
            recommendations.push(rec);
        }
        if let Some(rec) = self.strategy_passthrough(strategy) {
            recommendations.push(rec);
        }
        if let Some(rec) = self.retry_recommendation(result) {
            recommendations.push(rec);
        }

        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.confidence.total_cmp(&a.confidence))
        });

        debug!(count = recommendations.len(), "Synthesized recommendations");
        recommendations
    }

    /// Caching pays off for memoizable results; session-level cache
    /// strategies raise the confidence further.
    fn cache_recommendation(
        &self,
        prediction: &PerformancePrediction,
        strategy: Option<&OptimizationRecommendation>,
        result: &EnhancedResult,
    ) -> Option<CodeRecommendation> {
        let mut confidence: f64 = if result.is_cacheable { 0.6 } else { 0.3 };
        if strategy.is_some_and(|rec| {
            matches!(
                rec.strategy,
                OptimizationStrategy::CacheAggressive | OptimizationStrategy::CacheConservative
            )
        }) {
            confidence += 0.2;
        }
        let confidence = confidence.min(0.95);

        if confidence < EMIT_CONFIDENCE_FLOOR {
            return None;
        }

        Some(CodeRecommendation {
            kind: RecommendationKind::Cache,
            description: "Serve repeated runs of this snippet from the cache".to_string(),
            expected_savings_ms: prediction.predicted_time_ms,
            confidence,
            priority: 4,
            effort: Effort::Low,
            reason: format!("Result category {} is memoizable", result.category),
        })
    }

    fn split_recommendation(
        &self,
        prediction: &PerformancePrediction,
        result: &EnhancedResult,
    ) -> Option<CodeRecommendation> {
        if prediction.predicted_time_ms < SPLIT_TIME_THRESHOLD_MS || !result.is_successful() {
            return None;
        }

        let time = prediction.predicted_time_ms;
        let savings = (0.6 * time).min(time / 4.0).max(50.0);

        Some(CodeRecommendation {
            kind: RecommendationKind::Split,
            description: "Split this snippet into smaller execution units".to_string(),
            expected_savings_ms: savings,
            confidence: 0.7,
            priority: 3,
            effort: Effort::High,
            reason: format!("Predicted execution time {:.0}ms is high", time),
        })
    }

    fn profile_recommendation(
        &self,
        prediction: &PerformancePrediction,
    ) -> Option<CodeRecommendation> {
        let spread = prediction.max_time_ms - prediction.min_time_ms;
        if prediction.confidence > 0.8 || spread < PROFILE_SPREAD_THRESHOLD_MS {
            return None;
        }

        Some(CodeRecommendation {
            kind: RecommendationKind::Profile,
            description: "Collect more timing samples for this complexity class".to_string(),
            expected_savings_ms: 0.0,
            confidence: (1.0 - prediction.confidence).clamp(0.6, 0.85),
            priority: 2,
            effort: Effort::Low,
            reason: format!(
                "Prediction spread {:.0}ms with confidence {:.2}",
                spread, prediction.confidence
            ),
        })
    }

    fn strategy_passthrough(
        &self,
        strategy: Option<&OptimizationRecommendation>,
    ) -> Option<CodeRecommendation> {
        let rec = strategy?;
        if rec.confidence < EMIT_CONFIDENCE_FLOOR {
            return None;
        }

        // Session priority runs 1..=10 with 1 highest; fold into 5..=1.
        let priority = (5u8.saturating_sub(rec.priority / 2)).max(1);

        Some(CodeRecommendation {
            kind: RecommendationKind::Optimize,
            description: rec.description.clone(),
            expected_savings_ms: 0.0,
            confidence: rec.confidence,
            priority,
            effort: Effort::Medium,
            reason: rec.reason.clone(),
        })
    }

    fn retry_recommendation(&self, result: &EnhancedResult) -> Option<CodeRecommendation> {
        let transient = match result.category {
            ResultCategory::Timeout => true,
            ResultCategory::Failure => matches!(
                result.metadata.error_type,
                Some(ErrorCategory::Timeout)
                    | Some(ErrorCategory::Io)
                    | Some(ErrorCategory::Environment)
            ),
            _ => false,
        };
        if !transient {
            return None;
        }

        Some(CodeRecommendation {
            kind: RecommendationKind::Retry,
            description: "Retry this execution; the failure looks transient".to_string(),
            expected_savings_ms: result.metadata.execution_time_ms,
            confidence: 0.7,
            priority: 3,
            effort: Effort::Low,
            reason: format!("Failure category {} is retryable", result.category),
        })
    }

    /// Keeps recommendations at or above a confidence floor.
    pub fn filter_by_confidence(
        &self,
        recommendations: Vec<CodeRecommendation>,
        min_confidence: f64,
    ) -> Result<Vec<CodeRecommendation>, RecommendationError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(RecommendationError::ConfidenceOutOfRange(min_confidence));
        }
        Ok(recommendations
            .into_iter()
            .filter(|rec| rec.confidence >= min_confidence)
            .collect())
    }

    /// Truncates an already-sorted list to the top entries.
    pub fn top(
        &self,
        mut recommendations: Vec<CodeRecommendation>,
        limit: usize,
    ) -> Vec<CodeRecommendation> {
        recommendations.truncate(limit);
        recommendations
    }
}
