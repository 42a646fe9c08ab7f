//! Error taxonomy of the orchestrator
//!
//! Store misuse is a programming-contract violation and is never recovered.
//! Unit-build failures are demoted to warnings by the scheduler. Per-file and
//! fatal failures are represented as outcomes in `report`, not as errors here.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{store} store has not been initialized. Call load() first.")]
    Uninitialized { store: &'static str },

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn uninitialized(store: &'static str) -> Self {
        Self::Uninitialized { store }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a compilation unit could not be built. Always recovered locally: the
/// unit is tagged failed and its files take the untyped path.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to read descriptor '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid descriptor '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("descriptor inheritance cycle through '{path}'")]
    ExtendsCycle { path: PathBuf },

    #[error("type-check engine rejected '{descriptor}': {message}")]
    Engine {
        descriptor: PathBuf,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler instances are single-use; create a fresh one per run")]
    Exhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_message_is_fixed() {
        let err = StoreError::uninitialized("source file");
        assert_eq!(
            err.to_string(),
            "source file store has not been initialized. Call load() first."
        );
    }

    #[test]
    fn scheduler_error_wraps_store_error() {
        let err: SchedulerError = StoreError::uninitialized("tsconfig").into();
        assert!(err.to_string().contains("tsconfig"));
    }
}
