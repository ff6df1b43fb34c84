//! CLI command definitions for execforge.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use crate::config::PipelineConfig;
use crate::executor::SimulationBehavior;
use crate::export::ExportFormat;
use crate::pipeline::ExecutionPipeline;

/// Default per-execution timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Adaptive code-execution pipeline with caching, profiling and advice.
#[derive(Parser)]
#[command(name = "execforge")]
#[command(about = "Run code snippets through an adaptive execution pipeline")]
#[command(version)]
#[command(
    long_about = "execforge routes code snippets between a simulated and an isolated executor\nbased on a confidence score, memoizes results, profiles timings, and emits\noptimization recommendations.\n\nExample usage:\n  execforge run script.py --confidence 0.9 --format report"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run a snippet through the full pipeline and print a report.
    Run(RunArgs),

    /// Run a snippet repeatedly and print pattern analysis with advice.
    #[command(alias = "benchmark")]
    Bench(BenchArgs),
}

/// Arguments for `execforge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Snippet file to execute.
    pub file: Option<PathBuf>,

    /// Inline code to execute instead of a file.
    #[arg(short = 'c', long, conflicts_with = "file")]
    pub code: Option<String>,

    /// Confidence score driving executor routing, clamped to [0, 1].
    #[arg(long, default_value = "0.5")]
    pub confidence: f64,

    /// Per-execution timeout in seconds.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Output format (json, csv, text, report, html).
    #[arg(short, long, default_value = "report")]
    pub format: String,

    /// Interpreter binary for isolated execution.
    #[arg(long, env = "EXECFORGE_INTERPRETER")]
    pub interpreter: Option<PathBuf>,

    /// Suffix for the temporary snippet file.
    #[arg(long, default_value = ".py")]
    pub suffix: String,

    /// Simulation behavior (always_success, always_failure, random, heuristic).
    #[arg(long, default_value = "heuristic")]
    pub simulation: String,

    /// Fixed seed for the simulated executor.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `execforge bench`.
#[derive(Parser, Debug)]
pub struct BenchArgs {
    /// Snippet file to execute.
    pub file: PathBuf,

    /// Number of pipeline runs.
    #[arg(short = 'n', long, default_value = "10")]
    pub iterations: usize,

    /// Confidence score driving executor routing.
    #[arg(long, default_value = "0.65")]
    pub confidence: f64,

    /// Per-execution timeout in seconds.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Interpreter binary for isolated execution.
    #[arg(long, env = "EXECFORGE_INTERPRETER")]
    pub interpreter: Option<PathBuf>,

    /// Suffix for the temporary snippet file.
    #[arg(long, default_value = ".py")]
    pub suffix: String,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command with already-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_snippet(args).await,
        Commands::Bench(args) => bench_snippet(args).await,
    }
}

async fn run_snippet(args: RunArgs) -> anyhow::Result<()> {
    let code = load_code(args.file.as_deref(), args.code.as_deref())?;
    let format: ExportFormat = args.format.parse()?;
    let simulation = parse_simulation(&args.simulation)?;

    let mut config = PipelineConfig::default().with_simulation(simulation);
    if let Some(interpreter) = args.interpreter {
        config = config.with_interpreter(interpreter, args.suffix.clone());
    } else {
        config.source_suffix = args.suffix.clone();
    }
    if let Some(seed) = args.seed {
        config = config.with_simulation_seed(seed);
    }

    let mut pipeline = ExecutionPipeline::new(config);
    let result = pipeline
        .run(&code, args.confidence, Duration::from_secs(args.timeout))
        .await;

    info!(category = %result.category, "Execution complete");
    println!("{}", pipeline.report(&code, &result, format)?);
    Ok(())
}

async fn bench_snippet(args: BenchArgs) -> anyhow::Result<()> {
    if args.iterations == 0 {
        bail!("iterations must be at least 1");
    }
    let code = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read snippet file {}", args.file.display()))?;

    let mut config = PipelineConfig::default();
    if let Some(interpreter) = args.interpreter {
        config = config.with_interpreter(interpreter, args.suffix.clone());
    } else {
        config.source_suffix = args.suffix.clone();
    }
    // Bench measures real executions, so caching would defeat the point.
    config.cache_ttl = Duration::ZERO;

    let mut pipeline = ExecutionPipeline::new(config);
    for iteration in 0..args.iterations {
        let result = pipeline
            .run(&code, args.confidence, Duration::from_secs(args.timeout))
            .await;
        info!(
            iteration,
            category = %result.category,
            time_ms = result.metadata.execution_time_ms,
            "Bench iteration"
        );
    }

    match pipeline.analyze() {
        Some(analysis) => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            let advice = pipeline.advise();
            println!("{}", serde_json::to_string_pretty(&advice)?);
        }
        None => println!(
            "Not enough samples for analysis ({} runs recorded)",
            pipeline.stats().len()
        ),
    }
    Ok(())
}

fn load_code(file: Option<&std::path::Path>, inline: Option<&str>) -> anyhow::Result<String> {
    match (file, inline) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("failed to read snippet file {}", path.display())),
        (None, Some(code)) => Ok(code.to_string()),
        (None, None) => bail!("provide a snippet file or --code"),
    }
}

fn parse_simulation(name: &str) -> anyhow::Result<SimulationBehavior> {
    match name.to_lowercase().as_str() {
        "always_success" => Ok(SimulationBehavior::AlwaysSuccess),
        "always_failure" => Ok(SimulationBehavior::AlwaysFailure),
        "random" => Ok(SimulationBehavior::Random),
        "heuristic" => Ok(SimulationBehavior::Heuristic),
        other => bail!("unknown simulation behavior: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulation() {
        assert_eq!(
            parse_simulation("Heuristic").unwrap(),
            SimulationBehavior::Heuristic
        );
        assert!(parse_simulation("nope").is_err());
    }

    #[test]
    fn test_load_code_prefers_file_then_inline() {
        assert_eq!(load_code(None, Some("echo hi")).unwrap(), "echo hi");
        assert!(load_code(None, None).is_err());
    }

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "execforge",
            "run",
            "--code",
            "print(1)",
            "--confidence",
            "0.9",
            "--format",
            "json",
        ])
        .expect("valid args");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.code.as_deref(), Some("print(1)"));
                assert_eq!(args.confidence, 0.9);
                assert_eq!(args.format, "json");
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_rejects_file_and_code_together() {
        assert!(Cli::try_parse_from([
            "execforge",
            "run",
            "snippet.py",
            "--code",
            "print(1)",
        ])
        .is_err());
    }
}
