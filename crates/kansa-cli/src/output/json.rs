//! JSON output for programmatic integration

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use kansa_project::{FileResult, RunReport, RunStatus};

#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub version: &'static str,
    pub metadata: JsonMetadata,
    pub summary: JsonSummary,
    pub results: &'a [FileResult],
    pub warnings: &'a [String],
}

#[derive(Serialize)]
pub struct JsonMetadata {
    pub kansa_version: &'static str,
    pub analyzed_path: String,
}

#[derive(Serialize)]
pub struct JsonSummary {
    pub status: RunStatus,
    pub files_total: usize,
    pub files_analyzed: usize,
    pub findings: usize,
    pub failures: usize,
}

pub struct JsonFormatter {
    analyzed_path: String,
}

impl JsonFormatter {
    pub fn new(analyzed_path: &Path) -> Self {
        Self {
            analyzed_path: analyzed_path.display().to_string(),
        }
    }

    pub fn format(&self, report: &RunReport) -> Result<String> {
        let output = JsonOutput {
            version: "1",
            metadata: JsonMetadata {
                kansa_version: env!("CARGO_PKG_VERSION"),
                analyzed_path: self.analyzed_path.clone(),
            },
            summary: JsonSummary {
                status: report.status,
                files_total: report.files_total,
                files_analyzed: report.files_analyzed,
                findings: report.finding_count(),
                failures: report.failure_count(),
            },
            results: &report.results,
            warnings: &report.warnings,
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }
}
