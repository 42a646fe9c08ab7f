//! The analysis scheduler
//!
//! Drives a whole project run: discovery, partitioning files into compilation
//! units, deterministic per-file processing with cancellation checked at file
//! boundaries, per-file failure isolation, and a fatal-failure path that
//! aborts the run while preserving partial results.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;

use tracing::{debug, info, warn};

use kansa_core::context::{FileContext, FileKind, ManifestSummary};
use kansa_core::parser::ParsedSource;
use kansa_core::rules::{AnalysisFailure, FailureKind, RuleSet};

use crate::error::SchedulerError;
use crate::files::SourceFileStore;
use crate::package_json::{PackageMetadataStore, discover_package_manifests};
use crate::program::{CompilationUnit, CompilationUnitBuilder, TypeCheckEngine};
use crate::report::{
    AnalysisOutcome, FileFailure, FileResult, IncrementalEvent, ResultSink, RunReport, RunStatus,
};
use crate::settings::AnalysisSettings;
use crate::tsconfig::ProjectConfigStore;

/// The process-scoped caches, bundled for injection into the scheduler.
/// Retain them across runs to stay warm; call `clear` on root change.
#[derive(Debug, Default)]
pub struct ProjectStores {
    pub files: SourceFileStore,
    pub packages: PackageMetadataStore,
    pub tsconfigs: ProjectConfigStore,
}

impl ProjectStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.packages.clear();
        self.tsconfigs.clear();
    }
}

/// Run-scoped cancellation flag, settable from outside the scheduling loop.
/// Observed between files, never mid-file.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Scheduling,
    Running,
    Completed,
    Cancelled,
}

/// A (file, compilation-unit-or-none) pair queued for one scheduling pass.
#[derive(Debug, Clone)]
struct AnalysisTask {
    path: PathBuf,
    kind: FileKind,
    unit: Option<usize>,
}

/// Single-use orchestrator for one analysis run.
///
/// The stores are injected per call so they can outlive the scheduler; the
/// caller must not reload them while a run is in flight.
pub struct AnalysisScheduler<'a> {
    settings: AnalysisSettings,
    rules: &'a dyn RuleSet,
    engine: &'a dyn TypeCheckEngine,
    cancel: CancelFlag,
    channel: Option<Sender<IncrementalEvent>>,
    state: RunState,
}

impl<'a> AnalysisScheduler<'a> {
    pub fn new(
        settings: AnalysisSettings,
        rules: &'a dyn RuleSet,
        engine: &'a dyn TypeCheckEngine,
    ) -> Self {
        Self {
            settings,
            rules,
            engine,
            cancel: CancelFlag::new(),
            channel: None,
            state: RunState::Idle,
        }
    }

    /// Attaches an incremental channel receiving per-file results as they are
    /// produced.
    pub fn with_channel(mut self, channel: Sender<IncrementalEvent>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Uses an externally created cancellation flag instead of the built-in
    /// one, so the caller can share it before the run starts.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle for cancelling this run from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the full analysis. A scheduler cannot be reused: a second call
    /// fails with `SchedulerError::Exhausted`.
    pub fn run(
        &mut self,
        root: &Path,
        stores: &mut ProjectStores,
    ) -> Result<RunReport, SchedulerError> {
        if self.state != RunState::Idle {
            return Err(SchedulerError::Exhausted);
        }

        let mut sink = match self.channel.take() {
            Some(channel) => ResultSink::with_channel(channel),
            None => ResultSink::new(),
        };

        self.transition(RunState::Discovering);
        stores.files.load(root, &self.settings)?;
        stores.tsconfigs.load(root, &self.settings)?;
        let base_dir = stores.files.root()?.to_path_buf();
        let manifests = discover_package_manifests(&base_dir, &self.settings.exclusions)?;
        stores.packages.set(&base_dir, manifests);

        self.transition(RunState::Scheduling);
        let discovered = stores.files.files()?.clone();
        let filenames: Vec<PathBuf> = discovered.keys().cloned().collect();
        let mut sequence = stores.tsconfigs.iter_descriptors(
            &filenames,
            &base_dir,
            self.settings.lenient,
            self.settings.max_files_for_type_checking,
        )?;

        let mut builder = CompilationUnitBuilder::new(self.engine);
        let mut units: Vec<CompilationUnit> = Vec::new();
        let mut tasks: Vec<AnalysisTask> = Vec::new();
        let mut unassigned: BTreeSet<PathBuf> = discovered.keys().cloned().collect();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut referenced: VecDeque<PathBuf> = VecDeque::new();

        loop {
            // Discovered descriptors first, then any references they chained.
            let Some(descriptor) = sequence.next().or_else(|| referenced.pop_front()) else {
                break;
            };
            if !seen.insert(descriptor.clone()) {
                continue;
            }

            let unit = builder.build(&descriptor, &discovered);
            if let Some(reason) = unit.failure_reason() {
                sink.warn(format!(
                    "Failed to build compilation unit from '{}': {} \
                     (max TypeScript version supported by the type-check engine: {}). \
                     Its files will be analyzed without type information.",
                    descriptor.display(),
                    reason,
                    self.engine.max_supported_version(),
                ));
                continue;
            }

            let unit_index = units.len();
            for file in &unit.files {
                if unassigned.remove(file) {
                    tasks.push(AnalysisTask {
                        path: file.clone(),
                        kind: discovered[file].kind,
                        unit: Some(unit_index),
                    });
                }
            }
            referenced.extend(unit.references.iter().cloned());
            units.push(unit);
        }

        // Everything not covered by a built unit takes the untyped path.
        for path in &unassigned {
            tasks.push(AnalysisTask {
                path: path.clone(),
                kind: discovered[path].kind,
                unit: None,
            });
        }

        sink.set_total(tasks.len());
        debug!(
            tasks = tasks.len(),
            units = units.len(),
            untyped = unassigned.len(),
            "scheduling complete"
        );

        self.transition(RunState::Running);
        let total = tasks.len();
        let mut last_progress = Instant::now();

        for task in &tasks {
            if self.cancel.is_cancelled() {
                info!(analyzed = sink.analyzed(), total, "run cancelled");
                self.transition(RunState::Cancelled);
                return Ok(sink.finalize(RunStatus::Cancelled));
            }
            if last_progress.elapsed() >= self.settings.progress_interval {
                info!(analyzed = sink.analyzed(), total, "analysis progress");
                last_progress = Instant::now();
            }

            // A store failure here is a contract violation, not a per-file
            // outcome; it surfaces as the run's error.
            let manifest = match task.path.parent() {
                Some(dir) => stores.packages.nearest(dir)?,
                None => None,
            };

            match self.process(task, &units, manifest.as_ref().map(|m| &m.summary)) {
                Ok(result) => sink.record(result),
                Err(AnalysisFailure::Recoverable {
                    kind,
                    message,
                    line,
                }) => {
                    sink.record(FileResult {
                        path: task.path.clone(),
                        typed: task.unit.is_some(),
                        outcome: AnalysisOutcome::Failure {
                            failure: FileFailure {
                                kind,
                                message,
                                line,
                            },
                        },
                        parse_micros: 0,
                        analysis_micros: 0,
                    });
                }
                Err(AnalysisFailure::Fatal { message }) => {
                    warn!(path = %task.path.display(), message, "fatal failure; aborting run");
                    sink.warn(format!(
                        "Analysis aborted while processing '{}': {}. The environment signaled \
                         resource exhaustion; raise the host memory limit or lower \
                         max_files_for_type_checking (currently {}) to shrink compilation \
                         units, then re-run. Partial results up to this file are preserved.",
                        task.path.display(),
                        message,
                        self.settings.max_files_for_type_checking,
                    ));
                    self.transition(RunState::Completed);
                    return Ok(sink.finalize(RunStatus::Aborted));
                }
            }
        }

        self.transition(RunState::Completed);
        Ok(sink.finalize(RunStatus::Complete))
    }

    fn process(
        &self,
        task: &AnalysisTask,
        units: &[CompilationUnit],
        manifest: Option<&ManifestSummary>,
    ) -> Result<FileResult, AnalysisFailure> {
        let content = match self.settings.in_memory.get(&task.path) {
            Some(content) => content.clone(),
            None => std::fs::read_to_string(&task.path).map_err(|e| {
                AnalysisFailure::Recoverable {
                    kind: FailureKind::Io,
                    message: e.to_string(),
                    line: None,
                }
            })?,
        };

        let parse_start = Instant::now();
        let parsed = ParsedSource::parse(&task.path, &content);
        let parse_micros = parse_start.elapsed().as_micros() as u64;

        if parsed.module().is_none() {
            let issue = parsed.issues().first();
            return Err(AnalysisFailure::parse(
                issue.map(|i| i.message.clone()).unwrap_or_default(),
                issue.map(|i| i.line),
            ));
        }

        let type_query = task.unit.and_then(|i| units[i].type_query());
        let ctx = FileContext {
            kind: task.kind,
            manifest,
            type_query,
        };

        let analysis_start = Instant::now();
        let findings = self.rules.analyze(&parsed, &ctx)?;
        let analysis_micros = analysis_start.elapsed().as_micros() as u64;

        Ok(FileResult {
            path: task.path.clone(),
            typed: type_query.is_some(),
            outcome: AnalysisOutcome::Findings { findings },
            parse_micros,
            analysis_micros,
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "scheduler state");
        self.state = next;
    }
}
