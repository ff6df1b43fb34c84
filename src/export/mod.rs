//! Export layer: renders classified results in several output formats.
//!
//! Supports machine-readable JSON and CSV plus three human-oriented
//! renderings (plain text, a markdown report, and minimal HTML). Batch
//! export requires the result, prediction and recommendation collections
//! to line up one-to-one.

use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::classifier::EnhancedResult;
use crate::error::ExportError;
use crate::profiler::PerformancePrediction;
use crate::recommend::CodeRecommendation;

/// Version stamp embedded in structured exports.
pub const EXPORT_VERSION: &str = "1.0";

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
    Report,
    Html,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            "report" | "md" | "markdown" => Ok(ExportFormat::Report),
            "html" => Ok(ExportFormat::Html),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "text",
            ExportFormat::Report => "report",
            ExportFormat::Html => "html",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    version: &'static str,
    exported_at: String,
    result: &'a EnhancedResult,
    prediction: &'a PerformancePrediction,
    recommendations: &'a [CodeRecommendation],
}

/// Renders execution results and their companion analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultExporter;

impl ResultExporter {
    pub fn new() -> Self {
        Self
    }

    /// Exports one result in the requested format.
    pub fn export_single(
        &self,
        result: &EnhancedResult,
        prediction: &PerformancePrediction,
        recommendations: &[CodeRecommendation],
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        debug!(format = %format, "Exporting result");
        match format {
            ExportFormat::Json => self.to_json(result, prediction, recommendations),
            ExportFormat::Csv => Ok(format!(
                "{}\n{}",
                csv_header(),
                csv_row(result, prediction, recommendations)
            )),
            ExportFormat::Text => Ok(self.to_text(result, prediction, recommendations)),
            ExportFormat::Report => Ok(self.to_report(result, prediction, recommendations)),
            ExportFormat::Html => Ok(self.to_html(result, prediction, recommendations)),
        }
    }

    /// Exports a batch; the three slices must have equal lengths.
    ///
    /// CSV batches share a single header; other formats are concatenated
    /// with a separator line.
    pub fn export_batch(
        &self,
        results: &[EnhancedResult],
        predictions: &[PerformancePrediction],
        recommendations: &[Vec<CodeRecommendation>],
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        if results.len() != predictions.len() || results.len() != recommendations.len() {
            return Err(ExportError::BatchLengthMismatch {
                results: results.len(),
                predictions: predictions.len(),
                recommendations: recommendations.len(),
            });
        }

        if format == ExportFormat::Csv {
            let mut lines = vec![csv_header()];
            for ((result, prediction), recs) in
                results.iter().zip(predictions).zip(recommendations)
            {
                lines.push(csv_row(result, prediction, recs));
            }
            return Ok(lines.join("\n"));
        }

        let mut sections = Vec::with_capacity(results.len());
        for ((result, prediction), recs) in results.iter().zip(predictions).zip(recommendations) {
            sections.push(self.export_single(result, prediction, recs, format)?);
        }
        Ok(sections.join(&format!("\n{}\n", "=".repeat(60))))
    }

    fn to_json(
        &self,
        result: &EnhancedResult,
        prediction: &PerformancePrediction,
        recommendations: &[CodeRecommendation],
    ) -> Result<String, ExportError> {
        let envelope = JsonEnvelope {
            version: EXPORT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            result,
            prediction,
            recommendations,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    fn to_text(
        &self,
        result: &EnhancedResult,
        prediction: &PerformancePrediction,
        recommendations: &[CodeRecommendation],
    ) -> String {
        let mut out = String::new();
        out.push_str(&format!("Result: {}\n", result.summary));
        out.push_str(&format!(
            "Prediction: {:.0}ms (confidence {:.2}, {})\n",
            prediction.predicted_time_ms, prediction.confidence, prediction.reason
        ));
        if recommendations.is_empty() {
            out.push_str("Recommendations: none\n");
        } else {
            out.push_str("Recommendations:\n");
            for rec in recommendations {
                out.push_str(&format!(
                    "  [{}] {} (saves ~{:.0}ms, confidence {:.2})\n",
                    rec.kind, rec.description, rec.expected_savings_ms, rec.confidence
                ));
            }
        }
        out
    }

    fn to_report(
        &self,
        result: &EnhancedResult,
        prediction: &PerformancePrediction,
        recommendations: &[CodeRecommendation],
    ) -> String {
        let metadata = &result.metadata;
        let mut out = String::new();
        out.push_str("# Execution Report\n\n");
        out.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));

        out.push_str("## Result\n\n");
        out.push_str(&format!("- Category: {}\n", result.category));
        out.push_str(&format!("- Exit code: {}\n", metadata.exit_code));
        out.push_str(&format!("- Execution time: {:.1}ms\n", metadata.execution_time_ms));
        out.push_str(&format!("- Mode: {}\n", metadata.execution_mode));
        out.push_str(&format!("- Cacheable: {}\n", result.is_cacheable));
        if let Some(error) = metadata.error_type {
            out.push_str(&format!("- Error: {}\n", error));
        }

        out.push_str("\n## Prediction\n\n");
        out.push_str(&format!(
            "- Expected time: {:.0}ms (p{})\n",
            prediction.predicted_time_ms, prediction.percentile_used
        ));
        out.push_str(&format!(
            "- Range: {:.0}ms to {:.0}ms\n",
            prediction.min_time_ms, prediction.max_time_ms
        ));
        out.push_str(&format!("- Confidence: {:.2}\n", prediction.confidence));
        out.push_str(&format!("- Basis: {}\n", prediction.reason));

        out.push_str("\n## Recommendations\n\n");
        if recommendations.is_empty() {
            out.push_str("None.\n");
        } else {
            for rec in recommendations {
                out.push_str(&format!(
                    "- **{}** (priority {}): {} _{}_\n",
                    rec.kind, rec.priority, rec.description, rec.reason
                ));
            }
        }
        out
    }

    fn to_html(
        &self,
        result: &EnhancedResult,
        prediction: &PerformancePrediction,
        recommendations: &[CodeRecommendation],
    ) -> String {
        let mut items = String::new();
        for rec in recommendations {
            items.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>",
                rec.kind,
                html_escape(&rec.description)
            ));
        }
        format!(
            "<!DOCTYPE html>\n<html><head><title>Execution Report</title></head><body>\
             <h1>Execution Report</h1>\
             <p>{}</p>\
             <p>Predicted: {:.0}ms (confidence {:.2})</p>\
             <ul>{}</ul>\
             </body></html>",
            html_escape(&result.summary),
            prediction.predicted_time_ms,
            prediction.confidence,
            items
        )
    }
}

fn csv_header() -> String {
    "category,exit_code,execution_time_ms,mode,cacheable,predicted_time_ms,prediction_confidence,recommendation_count".to_string()
}

fn csv_row(
    result: &EnhancedResult,
    prediction: &PerformancePrediction,
    recommendations: &[CodeRecommendation],
) -> String {
    format!(
        "{},{},{:.3},{},{},{:.3},{:.3},{}",
        csv_escape(&result.category.to_string()),
        result.metadata.exit_code,
        result.metadata.execution_time_ms,
        result.metadata.execution_mode,
        result.is_cacheable,
        prediction.predicted_time_ms,
        prediction.confidence,
        recommendations.len()
    )
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
