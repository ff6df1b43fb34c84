//! End-to-end execution pipeline.
//!
//! Wires the cache, orchestrator, classifier, profiler, advisor and
//! synthesizer into a single entry point. A run consults the cache first,
//! then routes execution by confidence, classifies the raw result, feeds
//! the profiler and session statistics, and memoizes cacheable outcomes.

use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::advisor::{OptimizationAdvisor, OptimizationRecommendation, PatternAnalysis};
use crate::cache::{CacheStatistics, ResultCache};
use crate::classifier::{EnhancedResult, ResultClassifier};
use crate::config::PipelineConfig;
use crate::error::ExportError;
use crate::executor::{IsolatedConfig, IsolatedExecutor, SimulatedExecutor};
use crate::export::{ExportFormat, ResultExporter};
use crate::orchestrator::{ExecutionOrchestrator, OrchestratorStats};
use crate::profiler::{PerformancePrediction, PerformanceProfiler};
use crate::recommend::{CodeRecommendation, RecommendationSynthesizer};
use crate::stats::ExecutionStats;

/// Adaptive code-execution pipeline.
pub struct ExecutionPipeline {
    orchestrator: ExecutionOrchestrator,
    classifier: ResultClassifier,
    cache: ResultCache,
    profiler: PerformanceProfiler,
    advisor: OptimizationAdvisor,
    synthesizer: RecommendationSynthesizer,
    exporter: ResultExporter,
    stats: ExecutionStats,
    default_timeout: Duration,
}

impl ExecutionPipeline {
    /// Builds a pipeline from configuration.
    pub fn new(config: PipelineConfig) -> Self {
        let simulated = match config.simulation_seed {
            Some(seed) => SimulatedExecutor::with_seed(config.simulation, seed),
            None => SimulatedExecutor::new(config.simulation),
        };
        let isolated = IsolatedExecutor::new(
            IsolatedConfig::new(config.interpreter.clone())
                .with_source_suffix(config.source_suffix.clone())
                .with_timeout(config.default_timeout)
                .with_max_output_bytes(config.max_output_bytes),
        );

        Self {
            orchestrator: ExecutionOrchestrator::with_thresholds(
                simulated,
                isolated,
                config.high_confidence_threshold,
                config.low_confidence_threshold,
            ),
            classifier: ResultClassifier::new(),
            cache: ResultCache::new(
                config.cache_max_entries,
                config.cache_ttl,
                config.eviction_policy,
            ),
            profiler: PerformanceProfiler::new(),
            advisor: OptimizationAdvisor::new(),
            synthesizer: RecommendationSynthesizer::new(),
            exporter: ResultExporter::new(),
            stats: ExecutionStats::new(),
            default_timeout: config.default_timeout,
        }
    }

    /// Builds a pipeline with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// Runs a snippet with the configured default timeout.
    pub async fn run_with_default_timeout(
        &mut self,
        code: &str,
        confidence: f64,
    ) -> EnhancedResult {
        self.run(code, confidence, self.default_timeout).await
    }

    /// Runs a snippet through the full pipeline.
    ///
    /// Cache hits return the memoized result without touching the
    /// orchestrator or the session statistics.
    pub async fn run(
        &mut self,
        code: &str,
        confidence: f64,
        timeout: Duration,
    ) -> EnhancedResult {
        let invocation = Uuid::new_v4();
        info!(
            %invocation,
            code_len = code.len(),
            confidence,
            timeout_secs = timeout.as_secs(),
            "Pipeline run started"
        );

        if let Some(cached) = self.cache.get(code) {
            debug!(%invocation, "Cache hit, skipping execution");
            return cached;
        }

        let orchestrated = self.orchestrator.execute(code, confidence, timeout).await;
        let result = self.classifier.process(orchestrated);

        self.cache.put(code, result.clone(), None);
        self.profiler.update_profile(
            result.metadata.execution_time_ms,
            PerformanceProfiler::detect_complexity(code),
        );
        self.stats.record(&result);

        info!(
            %invocation,
            category = %result.category,
            execution_time_ms = result.metadata.execution_time_ms,
            cacheable = result.is_cacheable,
            "Pipeline run finished"
        );
        result
    }

    /// Predicts execution time for a snippet at the 95th percentile.
    pub fn predict(&self, code: &str) -> PerformancePrediction {
        self.profiler.predict_for_code(code, 95)
    }

    /// Analyzes the session's execution patterns.
    pub fn analyze(&self) -> Option<PatternAnalysis> {
        self.advisor.analyze_patterns(&self.stats)
    }

    /// Session-level optimization recommendations.
    pub fn advise(&self) -> Vec<OptimizationRecommendation> {
        self.advisor.advise(&self.stats)
    }

    /// Per-snippet recommendations combining all pipeline signals.
    pub fn recommend(&self, code: &str, result: &EnhancedResult) -> Vec<CodeRecommendation> {
        let prediction = self.predict(code);
        let advice = self.advise();
        self.synthesizer
            .synthesize(&prediction, advice.first(), result)
    }

    /// Renders a result, its prediction and its recommendations.
    pub fn report(
        &self,
        code: &str,
        result: &EnhancedResult,
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        let prediction = self.predict(code);
        let recommendations = self.recommend(code, result);
        self.exporter
            .export_single(result, &prediction, &recommendations, format)
    }

    /// Orchestrator routing counters.
    pub fn orchestrator_stats(&self) -> OrchestratorStats {
        self.orchestrator.stats()
    }

    /// Cache statistics, sweeping expired entries first.
    pub fn cache_statistics(&mut self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Session execution statistics.
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// The profiler backing predictions.
    pub fn profiler(&self) -> &PerformanceProfiler {
        &self.profiler
    }

    /// Clears the cache, profiles and all session statistics.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.profiler.clear();
        self.stats.clear();
        self.orchestrator.reset_stats();
    }
}
