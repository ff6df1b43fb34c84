//! Performance profiler: timing statistics and predictions per complexity.
//!
//! Executions are bucketed by a coarse code-complexity estimate. Each bucket
//! accumulates raw timings and derives a percentile profile once enough
//! samples exist; predictions fall back to a conservative default for
//! unprofiled buckets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Samples required before a profile is considered valid.
pub const MIN_PROFILE_SAMPLES: usize = 3;

/// Predicted time when no profile exists, in milliseconds.
pub const FALLBACK_PREDICTION_MS: f64 = 1000.0;

/// Prediction confidence when no profile exists.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Coarse complexity bucket for a code snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Short snippets, under roughly 500 tokens.
    Simple,
    /// Mid-size snippets, up to roughly 2000 tokens.
    Moderate,
    /// Everything larger.
    Complex,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Moderate => "moderate",
            ComplexityLevel::Complex => "complex",
        };
        write!(f, "{}", name)
    }
}

/// Aggregated timing profile for one complexity bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProfile {
    /// Bucket this profile describes.
    pub complexity_level: ComplexityLevel,
    /// Fastest observed execution.
    pub min_ms: f64,
    /// Slowest observed execution.
    pub max_ms: f64,
    /// Mean execution time.
    pub avg_ms: f64,
    /// Median execution time.
    pub p50_ms: f64,
    /// 95th percentile execution time.
    pub p95_ms: f64,
    /// 99th percentile execution time.
    pub p99_ms: f64,
    /// Number of samples behind this profile.
    pub sample_count: usize,
    /// Sample standard deviation of the timings.
    pub std_dev_ms: f64,
}

impl ExecutionProfile {
    /// Estimated time at a requested percentile (50, 95 or 99; anything
    /// else maps to 95).
    pub fn estimated_time(&self, percentile: u8) -> f64 {
        match percentile {
            50 => self.p50_ms,
            99 => self.p99_ms,
            _ => self.p95_ms,
        }
    }

    /// Whether the profile has enough samples to be trusted.
    pub fn is_valid(&self) -> bool {
        self.sample_count >= MIN_PROFILE_SAMPLES
    }
}

/// A time prediction for an upcoming execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformancePrediction {
    /// Predicted execution time in milliseconds.
    pub predicted_time_ms: f64,
    /// Confidence in the prediction, `[0, 1]`.
    pub confidence: f64,
    /// Human-readable basis for the prediction.
    pub reason: String,
    /// Bucket the prediction was drawn from.
    pub complexity_level: ComplexityLevel,
    /// Percentile used for the point estimate.
    pub percentile_used: u8,
    /// Lower bound (median) of the expected range.
    pub min_time_ms: f64,
    /// Upper bound (p99) of the expected range.
    pub max_time_ms: f64,
}

/// Tracks execution timings and predicts future ones.
#[derive(Debug, Default)]
pub struct PerformanceProfiler {
    profiles: HashMap<ComplexityLevel, ExecutionProfile>,
    history: HashMap<ComplexityLevel, Vec<f64>>,
}

impl PerformanceProfiler {
    /// Creates an empty profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimates the complexity bucket for a snippet.
    ///
    /// Uses a character-count token approximation of four characters per
    /// token, which is deliberately crude but stable across languages.
    pub fn detect_complexity(code: &str) -> ComplexityLevel {
        let approx_tokens = code.len() / 4;
        if approx_tokens < 500 {
            ComplexityLevel::Simple
        } else if approx_tokens < 2000 {
            ComplexityLevel::Moderate
        } else {
            ComplexityLevel::Complex
        }
    }

    /// Records a timing observation and refreshes the bucket's profile.
    pub fn update_profile(&mut self, execution_time_ms: f64, level: ComplexityLevel) {
        let samples = self.history.entry(level).or_default();
        samples.push(execution_time_ms);

        if let Some(profile) = Self::build_profile(samples, level) {
            debug!(
                complexity = %level,
                samples = profile.sample_count,
                p95_ms = profile.p95_ms,
                "Updated execution profile"
            );
            self.profiles.insert(level, profile);
        }
    }

    /// Builds a profile from raw timings, or `None` below the sample floor.
    pub fn build_profile(timings: &[f64], level: ComplexityLevel) -> Option<ExecutionProfile> {
        if timings.len() < MIN_PROFILE_SAMPLES {
            return None;
        }

        let mut sorted = timings.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let avg = sorted.iter().sum::<f64>() / count as f64;
        // Sample (n - 1) variance; buckets are small near the sample floor.
        let variance =
            sorted.iter().map(|t| (t - avg).powi(2)).sum::<f64>() / (count - 1) as f64;

        Some(ExecutionProfile {
            complexity_level: level,
            min_ms: sorted[0],
            max_ms: sorted[count - 1],
            avg_ms: avg,
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
            sample_count: count,
            std_dev_ms: variance.sqrt(),
        })
    }

    /// Predicts the execution time for a complexity bucket.
    pub fn predict(&self, level: ComplexityLevel, percentile: u8) -> PerformancePrediction {
        let Some(profile) = self.profiles.get(&level) else {
            return PerformancePrediction {
                predicted_time_ms: FALLBACK_PREDICTION_MS,
                confidence: FALLBACK_CONFIDENCE,
                reason: format!("No profile available for {} code", level),
                complexity_level: level,
                percentile_used: percentile,
                min_time_ms: FALLBACK_PREDICTION_MS,
                max_time_ms: FALLBACK_PREDICTION_MS,
            };
        };

        // Confidence grows with sample volume and shrinks with volatility.
        let sample_factor = (profile.sample_count as f64 / 100.0).min(1.0);
        let stability_factor = if profile.avg_ms > 0.0 {
            1.0 / (1.0 + profile.std_dev_ms / profile.avg_ms)
        } else {
            1.0
        };
        let confidence = (sample_factor + stability_factor) / 2.0;

        PerformancePrediction {
            predicted_time_ms: profile.estimated_time(percentile),
            confidence,
            reason: format!(
                "Based on {} samples of {} code (p{})",
                profile.sample_count, level, percentile
            ),
            complexity_level: level,
            percentile_used: percentile,
            min_time_ms: profile.p50_ms,
            max_time_ms: profile.p99_ms,
        }
    }

    /// Predicts directly from a snippet at the given percentile.
    pub fn predict_for_code(&self, code: &str, percentile: u8) -> PerformancePrediction {
        self.predict(Self::detect_complexity(code), percentile)
    }

    /// Predictions for a batch of snippets at one percentile.
    pub fn forecast_batch(&self, snippets: &[&str], percentile: u8) -> Vec<PerformancePrediction> {
        snippets
            .iter()
            .map(|code| self.predict_for_code(code, percentile))
            .collect()
    }

    /// Returns the profile for a bucket, if one exists.
    pub fn profile(&self, level: ComplexityLevel) -> Option<&ExecutionProfile> {
        self.profiles.get(&level)
    }

    /// All current profiles.
    pub fn all_profiles(&self) -> &HashMap<ComplexityLevel, ExecutionProfile> {
        &self.profiles
    }

    /// Drops all samples and profiles.
    pub fn clear(&mut self) {
        self.profiles.clear();
        self.history.clear();
    }
}

/// Percentile of a sorted slice with linear interpolation between ranks.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_complexity_boundaries() {
        assert_eq!(
            PerformanceProfiler::detect_complexity("x = 1"),
            ComplexityLevel::Simple
        );
        // 1999 tokens => 7996 chars, still under the 2000-token line.
        assert_eq!(
            PerformanceProfiler::detect_complexity(&"a".repeat(7996)),
            ComplexityLevel::Moderate
        );
        assert_eq!(
            PerformanceProfiler::detect_complexity(&"a".repeat(8000)),
            ComplexityLevel::Complex
        );
    }

    #[test]
    fn test_predict_without_profile_falls_back() {
        let profiler = PerformanceProfiler::new();
        let prediction = profiler.predict(ComplexityLevel::Simple, 95);
        assert_eq!(prediction.predicted_time_ms, FALLBACK_PREDICTION_MS);
        assert_eq!(prediction.confidence, FALLBACK_CONFIDENCE);
        assert!(prediction.reason.contains("No profile"));
    }

    #[test]
    fn test_profile_requires_minimum_samples() {
        let mut profiler = PerformanceProfiler::new();
        profiler.update_profile(10.0, ComplexityLevel::Simple);
        profiler.update_profile(12.0, ComplexityLevel::Simple);
        assert!(profiler.profile(ComplexityLevel::Simple).is_none());

        profiler.update_profile(11.0, ComplexityLevel::Simple);
        let profile = profiler
            .profile(ComplexityLevel::Simple)
            .expect("profile after three samples");
        assert!(profile.is_valid());
        assert_eq!(profile.sample_count, 3);
    }

    #[test]
    fn test_identical_samples_give_stable_prediction() {
        let mut profiler = PerformanceProfiler::new();
        for _ in 0..5 {
            profiler.update_profile(40.0, ComplexityLevel::Simple);
        }
        let prediction = profiler.predict(ComplexityLevel::Simple, 50);
        assert!((prediction.predicted_time_ms - 40.0).abs() < 1e-9);
        // Zero variance: stability factor is 1, sample factor 5/100.
        assert!((prediction.confidence - 0.525).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev_uses_sample_estimator() {
        let profile =
            PerformanceProfiler::build_profile(&[10.0, 20.0, 30.0], ComplexityLevel::Simple)
                .expect("profile");
        // Sample variance of [10, 20, 30] is 100, so the deviation is 10.
        assert!((profile.std_dev_ms - 10.0).abs() < 1e-9);
        assert!((profile.avg_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&sorted, 50.0) - 25.0).abs() < 1e-9);
        assert!((percentile(&sorted, 0.0) - 10.0).abs() < 1e-9);
        assert!((percentile(&sorted, 100.0) - 40.0).abs() < 1e-9);
        assert!((percentile(&[7.0], 95.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimated_time_percentile_mapping() {
        let profile = PerformanceProfiler::build_profile(
            &[10.0, 20.0, 30.0, 100.0],
            ComplexityLevel::Moderate,
        )
        .expect("profile");
        assert_eq!(profile.estimated_time(50), profile.p50_ms);
        assert_eq!(profile.estimated_time(99), profile.p99_ms);
        assert_eq!(profile.estimated_time(42), profile.p95_ms);
    }

    #[test]
    fn test_buckets_are_independent() {
        let mut profiler = PerformanceProfiler::new();
        for _ in 0..3 {
            profiler.update_profile(10.0, ComplexityLevel::Simple);
        }
        assert!(profiler.profile(ComplexityLevel::Complex).is_none());
        let prediction = profiler.predict(ComplexityLevel::Complex, 95);
        assert_eq!(prediction.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_forecast_batch_predicts_each_snippet() {
        let mut profiler = PerformanceProfiler::new();
        for _ in 0..3 {
            profiler.update_profile(25.0, ComplexityLevel::Simple);
        }
        let long = "a".repeat(8000);
        let predictions = profiler.forecast_batch(&["x = 1", long.as_str()], 95);
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].complexity_level, ComplexityLevel::Simple);
        assert!((predictions[0].predicted_time_ms - 25.0).abs() < 1e-9);
        // No samples for complex code, so the second prediction falls back.
        assert_eq!(predictions[1].confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_clear_drops_state() {
        let mut profiler = PerformanceProfiler::new();
        for _ in 0..3 {
            profiler.update_profile(10.0, ComplexityLevel::Simple);
        }
        profiler.clear();
        assert!(profiler.all_profiles().is_empty());
    }
}
