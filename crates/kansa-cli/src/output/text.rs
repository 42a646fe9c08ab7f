//! Human-readable text output

use std::fmt::Write;

use colored::Colorize;

use kansa_core::rules::Severity;
use kansa_project::{RunReport, RunStatus};

pub struct TextFormatter;

impl TextFormatter {
    pub fn format(&self, report: &RunReport) -> String {
        let mut out = String::new();

        for result in &report.results {
            for finding in result.outcome.findings() {
                let severity = match finding.severity {
                    Severity::Error => "error".red().bold(),
                    Severity::Warning => "warning".yellow().bold(),
                    Severity::Info => "info".blue().bold(),
                };
                let _ = writeln!(
                    out,
                    "{}:{}:{}: {} [{}]: {}",
                    finding.file,
                    finding.line,
                    finding.column,
                    severity,
                    finding.rule_id.dimmed(),
                    finding.message
                );
            }
            if let Some(failure) = result.outcome.failure() {
                let location = match failure.line {
                    Some(line) => format!("{}:{}", result.path.display(), line),
                    None => result.path.display().to_string(),
                };
                let _ = writeln!(
                    out,
                    "{}: {} {}",
                    location,
                    "failed:".red().bold(),
                    failure.message
                );
            }
        }

        for warning in &report.warnings {
            let _ = writeln!(out, "{} {}", "warning:".yellow().bold(), warning);
        }

        let _ = writeln!(
            out,
            "\n{} file(s) analyzed, {} finding(s), {} failure(s)",
            report.files_analyzed,
            report.finding_count(),
            report.failure_count()
        );
        match report.status {
            RunStatus::Complete => {}
            RunStatus::Cancelled => {
                let _ = writeln!(
                    out,
                    "Run cancelled after {} of {} file(s).",
                    report.files_analyzed, report.files_total
                );
            }
            RunStatus::Aborted => {
                let _ = writeln!(
                    out,
                    "Run aborted after {} of {} file(s); results are partial.",
                    report.files_analyzed, report.files_total
                );
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kansa_core::diagnostic::Finding;
    use kansa_project::{AnalysisOutcome, FileResult};

    #[test]
    fn text_output_lists_findings_and_totals() {
        colored::control::set_override(false);
        let report = RunReport {
            results: vec![FileResult {
                path: "/p/a.js".into(),
                typed: true,
                outcome: AnalysisOutcome::Findings {
                    findings: vec![Finding::new(
                        "K001",
                        Severity::Warning,
                        "Unexpected debugger statement",
                        "/p/a.js",
                        2,
                        1,
                    )],
                },
                parse_micros: 5,
                analysis_micros: 7,
            }],
            warnings: Vec::new(),
            status: RunStatus::Complete,
            files_analyzed: 1,
            files_total: 1,
        };

        let text = TextFormatter.format(&report);
        assert!(text.contains("/p/a.js:2:1"));
        assert!(text.contains("K001"));
        assert!(text.contains("1 file(s) analyzed, 1 finding(s), 0 failure(s)"));
    }

    #[test]
    fn text_output_reports_cancellation() {
        colored::control::set_override(false);
        let report = RunReport {
            results: Vec::new(),
            warnings: Vec::new(),
            status: RunStatus::Cancelled,
            files_analyzed: 0,
            files_total: 4,
        };

        let text = TextFormatter.format(&report);
        assert!(text.contains("cancelled after 0 of 4"));
    }
}
