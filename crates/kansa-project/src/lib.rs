//! Project analysis orchestration for Kansa
//!
//! Partitions a source tree into type-checked compilation units, builds the
//! underlying programs lazily, schedules per-file analysis deterministically
//! with cancellation and failure isolation, and streams results incrementally.
//!
//! The stores (`SourceFileStore`, `PackageMetadataStore`, `ProjectConfigStore`)
//! are process-scoped caches with an explicit load/clear lifecycle, injected
//! into the scheduler so repeated runs can stay warm while tests remain
//! isolated.

pub mod error;
pub mod events;
pub mod files;
pub mod package_json;
pub mod program;
pub mod report;
pub mod scheduler;
pub mod settings;
pub mod tsconfig;

pub use error::{BuildError, SchedulerError, StoreError};
pub use events::{FsEvent, FsEventKind};
pub use files::{SourceFile, SourceFileStore};
pub use package_json::{PackageManifest, PackageMetadataStore};
pub use program::{
    CompilationUnit, CompilationUnitBuilder, EngineError, SyntacticEngine, TypeCheckEngine,
};
pub use report::{
    AnalysisOutcome, FileFailure, FileResult, IncrementalEvent, ResultSink, RunReport, RunStatus,
};
pub use scheduler::{AnalysisScheduler, CancelFlag, ProjectStores, RunState};
pub use settings::AnalysisSettings;
pub use tsconfig::ProjectConfigStore;
