//! execforge: an adaptive code-execution pipeline.
//!
//! Snippets are routed between a cheap simulated executor and a real
//! isolated executor based on a caller-supplied confidence score. Raw
//! results are classified and enriched, memoized in a content-hashed
//! cache, profiled for timing predictions, and turned into optimization
//! recommendations exportable in several formats.
//!
//! The main entry point is [`pipeline::ExecutionPipeline`].

pub mod advisor;
pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod orchestrator;
pub mod pipeline;
pub mod profiler;
pub mod recommend;
pub mod stats;

pub use error::{ExportError, RecommendationError};
pub use pipeline::ExecutionPipeline;
