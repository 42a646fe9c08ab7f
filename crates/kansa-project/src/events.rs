//! Filesystem change events driving cache invalidation
//!
//! Long-running hosts (editor integrations) feed these between runs; the
//! stores decide whether their caches must be dropped.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Case-insensitive basename comparison, used for reserved-filename
    /// matches such as `package.json`.
    pub fn basename_is(&self, name: &str) -> bool {
        basename_lower(&self.path) == name.to_lowercase()
    }
}

pub(crate) fn basename_lower(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase()
}
