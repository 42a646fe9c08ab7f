//! Run reports and incremental result delivery
//!
//! The sink accumulates per-file outcomes into the final `RunReport` and, when
//! an incremental channel was supplied, forwards a serializable projection of
//! each outcome immediately so long-running callers can display results before
//! the whole project finishes.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::debug;

use kansa_core::diagnostic::Finding;
use kansa_core::rules::FailureKind;

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every task was processed.
    Complete,
    /// The cancellation flag tripped; recorded outcomes are preserved.
    Cancelled,
    /// A fatal failure ended the run early; the report is incomplete.
    Aborted,
}

/// A recoverable per-file failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase", tag = "result")]
pub enum AnalysisOutcome {
    Findings { findings: Vec<Finding> },
    Failure { failure: FileFailure },
}

impl AnalysisOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            Self::Findings { findings } => findings,
            Self::Failure { .. } => &[],
        }
    }

    pub fn failure(&self) -> Option<&FileFailure> {
        match self {
            Self::Findings { .. } => None,
            Self::Failure { failure } => Some(failure),
        }
    }
}

/// One analyzed file's entry in the report.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    /// Whether a compilation unit's type-query interface was attached.
    pub typed: bool,
    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
    pub parse_micros: u64,
    pub analysis_micros: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<FileResult>,
    pub warnings: Vec<String>,
    pub status: RunStatus,
    pub files_analyzed: usize,
    pub files_total: usize,
}

impl RunReport {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            warnings: Vec::new(),
            status: RunStatus::Complete,
            files_analyzed: 0,
            files_total: 0,
        }
    }

    pub fn finding_count(&self) -> usize {
        self.results.iter().map(|r| r.outcome.findings().len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_failure())
            .count()
    }
}

/// Serializable projection sent through the incremental channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase", tag = "event")]
pub enum IncrementalEvent {
    Result(FileResult),
    Warning { message: String },
    Finished { status: RunStatus },
}

/// Accumulates outcomes and forwards them incrementally.
///
/// A disconnected channel is ignored: result delivery is best-effort and
/// retries belong to the transport layer.
pub struct ResultSink {
    report: RunReport,
    channel: Option<Sender<IncrementalEvent>>,
    finalized: bool,
}

impl ResultSink {
    pub fn new() -> Self {
        Self {
            report: RunReport::new(),
            channel: None,
            finalized: false,
        }
    }

    pub fn with_channel(channel: Sender<IncrementalEvent>) -> Self {
        Self {
            report: RunReport::new(),
            channel: Some(channel),
            finalized: false,
        }
    }

    pub fn set_total(&mut self, total: usize) {
        self.report.files_total = total;
    }

    pub fn record(&mut self, result: FileResult) {
        if self.finalized {
            debug!(path = %result.path.display(), "result after finalize dropped");
            return;
        }
        if let Some(channel) = &self.channel {
            let _ = channel.send(IncrementalEvent::Result(result.clone()));
        }
        self.report.files_analyzed += 1;
        self.report.results.push(result);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if let Some(channel) = &self.channel {
            let _ = channel.send(IncrementalEvent::Warning {
                message: message.clone(),
            });
        }
        self.report.warnings.push(message);
    }

    pub fn analyzed(&self) -> usize {
        self.report.files_analyzed
    }

    /// Seals the report. Idempotent: the first call fixes the status, later
    /// calls return the same report.
    pub fn finalize(&mut self, status: RunStatus) -> RunReport {
        if !self.finalized {
            self.finalized = true;
            self.report.status = status;
            if let Some(channel) = &self.channel {
                let _ = channel.send(IncrementalEvent::Finished { status });
            }
        }
        self.report.clone()
    }
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new()
    }
}
