//! End-to-end pipeline tests against a real shell interpreter.

use std::time::Duration;

use execforge::classifier::ResultCategory;
use execforge::config::PipelineConfig;
use execforge::executor::{ErrorCategory, SimulationBehavior};
use execforge::export::ExportFormat;
use execforge::orchestrator::ExecutionMode;
use execforge::pipeline::ExecutionPipeline;
use execforge::recommend::RecommendationKind;

fn shell_pipeline() -> ExecutionPipeline {
    ExecutionPipeline::new(PipelineConfig::shell().with_simulation_seed(23))
}

#[tokio::test]
async fn high_confidence_run_is_isolated_and_cached() {
    let mut pipeline = shell_pipeline();
    let result = pipeline
        .run("echo hello", 0.95, Duration::from_secs(10))
        .await;

    assert_eq!(result.category, ResultCategory::Success);
    assert_eq!(result.metadata.execution_mode, ExecutionMode::IsolatedOnly);
    assert!(result.is_cacheable);
    assert_eq!(result.primary_output.as_deref().map(str::trim), Some("hello"));

    // A repeat run is served from the cache without re-executing.
    pipeline
        .run("echo hello", 0.95, Duration::from_secs(10))
        .await;
    assert_eq!(pipeline.orchestrator_stats().total, 1);
    assert_eq!(pipeline.cache_statistics().hits, 1);
}

#[tokio::test]
async fn timeout_is_classified_and_not_cached() {
    let mut pipeline = shell_pipeline();
    let result = pipeline
        .run("sleep 30", 0.95, Duration::from_secs(1))
        .await;

    assert_eq!(result.category, ResultCategory::Timeout);
    assert_eq!(result.metadata.exit_code, -1);
    assert_eq!(result.metadata.error_type, Some(ErrorCategory::Timeout));
    assert!(!result.is_cacheable);

    // The timeout must not be memoized; a rerun executes again.
    pipeline.run("sleep 30", 0.95, Duration::from_secs(1)).await;
    assert_eq!(pipeline.orchestrator_stats().total, 2);
}

#[tokio::test]
async fn low_confidence_run_never_spawns_a_process() {
    let mut pipeline = ExecutionPipeline::new(
        PipelineConfig::shell()
            .with_simulation(SimulationBehavior::AlwaysSuccess)
            .with_simulation_seed(5),
    );
    let result = pipeline
        .run("echo never-run", 0.2, Duration::from_secs(10))
        .await;

    assert_eq!(result.metadata.execution_mode, ExecutionMode::SimulatedOnly);
    assert!(!result.metadata.is_real_execution);
    assert!(result.orchestrated.secondary.is_none());
}

#[tokio::test]
async fn dual_mode_tracks_executor_disagreement() {
    let mut pipeline = ExecutionPipeline::new(
        PipelineConfig::shell()
            .with_simulation(SimulationBehavior::AlwaysFailure)
            .with_simulation_seed(9),
    );

    for i in 0..5 {
        let result = pipeline
            .run(&format!("echo run-{}", i), 0.65, Duration::from_secs(10))
            .await;
        // Isolated execution is authoritative despite the simulated failure.
        assert_eq!(result.category, ResultCategory::Success);
        assert_eq!(result.orchestrated.agreement(), Some(false));
    }

    assert_eq!(pipeline.orchestrator_stats().agreement_rate(), Some(0.0));
    let analysis = pipeline.analyze().expect("five samples recorded");
    assert_eq!(analysis.agreement_rate, Some(0.0));
    assert_eq!(analysis.sample_count, 5);
}

#[tokio::test]
async fn advice_and_recommendations_flow_from_real_runs() {
    let mut pipeline = shell_pipeline();
    let mut last = None;
    for i in 0..5 {
        last = Some(
            pipeline
                .run(&format!("echo advice-{}", i), 0.95, Duration::from_secs(10))
                .await,
        );
    }
    let result = last.expect("at least one run");

    let advice = pipeline.advise();
    assert!(!advice.is_empty());

    let recs = pipeline.recommend("echo advice-0", &result);
    assert!(recs
        .iter()
        .any(|rec| rec.kind == RecommendationKind::Cache));
}

#[tokio::test]
async fn report_renders_every_format() {
    let mut pipeline = shell_pipeline();
    let result = pipeline
        .run("echo report", 0.95, Duration::from_secs(10))
        .await;

    for format in [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Text,
        ExportFormat::Report,
        ExportFormat::Html,
    ] {
        let rendered = pipeline
            .report("echo report", &result, format)
            .expect("export succeeds");
        assert!(!rendered.is_empty());
    }
}

#[tokio::test]
async fn failing_snippet_surfaces_stderr() {
    let mut pipeline = shell_pipeline();
    let result = pipeline
        .run("echo broken >&2; exit 2", 0.95, Duration::from_secs(10))
        .await;

    assert!(!result.is_successful() || result.category == ResultCategory::PartialSuccess);
    assert_eq!(result.metadata.exit_code, 2);
    assert!(result.metadata.has_stderr);
    assert!(result.summary.contains("Exit code: 2") || result.summary.contains("2"));
}
