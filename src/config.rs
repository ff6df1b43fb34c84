//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{EvictionPolicy, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::executor::{SimulationBehavior, MAX_OUTPUT_BYTES};
use crate::orchestrator::{DEFAULT_HIGH_CONFIDENCE_THRESHOLD, DEFAULT_LOW_CONFIDENCE_THRESHOLD};

/// Full configuration for an execution pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Confidence above which only the isolated executor runs.
    pub high_confidence_threshold: f64,
    /// Confidence below which only the simulated executor runs.
    pub low_confidence_threshold: f64,
    /// Default per-execution timeout.
    pub default_timeout: Duration,
    /// Interpreter binary for isolated execution.
    pub interpreter: PathBuf,
    /// Suffix for temporary snippet files.
    pub source_suffix: String,
    /// Per-stream output capture cap in bytes.
    pub max_output_bytes: usize,
    /// Behavior of the simulated executor.
    pub simulation: SimulationBehavior,
    /// Optional fixed seed for the simulated executor.
    pub simulation_seed: Option<u64>,
    /// Cache capacity in entries.
    pub cache_max_entries: usize,
    /// Default cache TTL.
    pub cache_ttl: Duration,
    /// Cache eviction policy.
    pub eviction_policy: EvictionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            default_timeout: Duration::from_secs(30),
            interpreter: PathBuf::from("python3"),
            source_suffix: ".py".to_string(),
            max_output_bytes: MAX_OUTPUT_BYTES,
            simulation: SimulationBehavior::Heuristic,
            simulation_seed: None,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_ttl: DEFAULT_TTL,
            eviction_policy: EvictionPolicy::Lru,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset running snippets under `/bin/sh`.
    pub fn shell() -> Self {
        Self {
            interpreter: PathBuf::from("/bin/sh"),
            source_suffix: ".sh".to_string(),
            ..Self::default()
        }
    }

    /// Sets the routing thresholds.
    pub fn with_thresholds(mut self, high: f64, low: f64) -> Self {
        self.high_confidence_threshold = high;
        self.low_confidence_threshold = low;
        self
    }

    /// Sets the default execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the interpreter and snippet suffix together.
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self.source_suffix = suffix.into();
        self
    }

    /// Sets the simulation behavior.
    pub fn with_simulation(mut self, behavior: SimulationBehavior) -> Self {
        self.simulation = behavior;
        self
    }

    /// Fixes the simulation seed for reproducible runs.
    pub fn with_simulation_seed(mut self, seed: u64) -> Self {
        self.simulation_seed = Some(seed);
        self
    }

    /// Sets the cache capacity, TTL and eviction policy.
    pub fn with_cache(
        mut self,
        max_entries: usize,
        ttl: Duration,
        policy: EvictionPolicy,
    ) -> Self {
        self.cache_max_entries = max_entries;
        self.cache_ttl = ttl;
        self.eviction_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.high_confidence_threshold, 0.8);
        assert_eq!(config.low_confidence_threshold, 0.5);
        assert_eq!(config.interpreter, PathBuf::from("python3"));
        assert_eq!(config.cache_max_entries, 500);
        assert_eq!(config.eviction_policy, EvictionPolicy::Lru);
    }

    #[test]
    fn test_builders_compose() {
        let config = PipelineConfig::shell()
            .with_thresholds(0.9, 0.4)
            .with_timeout(Duration::from_secs(5))
            .with_simulation(SimulationBehavior::AlwaysSuccess)
            .with_simulation_seed(7)
            .with_cache(10, Duration::from_secs(60), EvictionPolicy::Lfu);

        assert_eq!(config.interpreter, PathBuf::from("/bin/sh"));
        assert_eq!(config.source_suffix, ".sh");
        assert_eq!(config.high_confidence_threshold, 0.9);
        assert_eq!(config.simulation_seed, Some(7));
        assert_eq!(config.cache_max_entries, 10);
    }

    #[test]
    fn test_config_serializes() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: PipelineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.cache_ttl, config.cache_ttl);
        assert_eq!(back.simulation, config.simulation);
    }
}
