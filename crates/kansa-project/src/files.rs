//! Source file discovery and classification
//!
//! One synchronous walk over the root produces the immutable set of candidate
//! JS/TS files, each classified MAIN or TEST. Iteration order is lexicographic
//! by path so downstream batching is reproducible across runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use kansa_core::context::FileKind;
use kansa_core::parser::is_js_ts_path;

use crate::error::StoreError;
use crate::settings::AnalysisSettings;

/// A discovered source file. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub size: u64,
}

#[derive(Debug)]
struct LoadedFiles {
    root: PathBuf,
    files: BTreeMap<PathBuf, SourceFile>,
}

/// Process-scoped cache of discovered source files.
#[derive(Debug, Default)]
pub struct SourceFileStore {
    state: Option<LoadedFiles>,
}

impl SourceFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks the tree once and replaces any previously loaded state.
    pub fn load(&mut self, root: &Path, settings: &AnalysisSettings) -> Result<(), StoreError> {
        let root = normalize_root(root)?;
        let exclusions = build_globset(&settings.exclusions)?;
        let test_patterns = build_globset(&settings.test_patterns)?;

        let mut files = BTreeMap::new();
        for entry in project_walk(&root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_js_ts_path(entry.path()) {
                continue;
            }
            let path = entry.path().to_path_buf();
            if matches_relative(&exclusions, &root, &path) {
                continue;
            }
            let kind = if matches_relative(&test_patterns, &root, &path) {
                FileKind::Test
            } else {
                FileKind::Main
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.insert(path.clone(), SourceFile { path, kind, size });
        }

        info!(count = files.len(), root = %root.display(), "discovered source files");
        self.state = Some(LoadedFiles { root, files });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.state = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn root(&self) -> Result<&Path, StoreError> {
        Ok(&self.loaded()?.root)
    }

    /// Path → SourceFile mapping in lexicographic path order.
    pub fn files(&self) -> Result<&BTreeMap<PathBuf, SourceFile>, StoreError> {
        Ok(&self.loaded()?.files)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.loaded()?.files.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.loaded()?.files.is_empty())
    }

    pub fn filenames(&self) -> Result<Vec<PathBuf>, StoreError> {
        Ok(self.loaded()?.files.keys().cloned().collect())
    }

    pub fn get(&self, path: &Path) -> Result<Option<&SourceFile>, StoreError> {
        Ok(self.loaded()?.files.get(path))
    }

    fn loaded(&self) -> Result<&LoadedFiles, StoreError> {
        self.state
            .as_ref()
            .ok_or(StoreError::uninitialized("source file"))
    }
}

/// Normalizes to an absolute path without resolving symlinks.
pub(crate) fn normalize_root(root: &Path) -> Result<PathBuf, StoreError> {
    std::path::absolute(root).map_err(|e| StoreError::io(root, e))
}

/// Walker shared by all discovery passes: sorted for determinism, skipping
/// hidden directories and `node_modules`.
pub(crate) fn project_walk(root: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name == "node_modules")
        .unwrap_or(false)
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet, StoreError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| StoreError::InvalidPattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

pub(crate) fn matches_relative(set: &GlobSet, root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    set.is_match(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "const a = 1;\n").unwrap();
    }

    #[test]
    fn access_before_load_fails_with_uninitialized() {
        let store = SourceFileStore::new();
        assert!(matches!(
            store.files(),
            Err(StoreError::Uninitialized { .. })
        ));
        assert!(matches!(store.len(), Err(StoreError::Uninitialized { .. })));
        assert!(matches!(
            store.filenames(),
            Err(StoreError::Uninitialized { .. })
        ));
    }

    #[test]
    fn load_discovers_js_ts_files_in_path_order() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("src/b.ts"));
        touch(&dir.path().join("src/a.ts"));
        touch(&dir.path().join("readme.md"));

        let mut store = SourceFileStore::new();
        store.load(dir.path(), &AnalysisSettings::default()).unwrap();

        let names = store.filenames().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("a.ts"));
        assert!(names[1].ends_with("b.ts"));
    }

    #[test]
    fn classifies_test_files_by_pattern() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("src/app.ts"));
        touch(&dir.path().join("src/app.test.ts"));

        let mut store = SourceFileStore::new();
        store.load(dir.path(), &AnalysisSettings::default()).unwrap();

        let files = store.files().unwrap();
        let kinds: Vec<FileKind> = files.values().map(|f| f.kind).collect();
        assert!(kinds.contains(&FileKind::Main));
        assert!(kinds.contains(&FileKind::Test));

        let test_file = files
            .values()
            .find(|f| f.kind == FileKind::Test)
            .unwrap();
        assert!(test_file.path.ends_with("app.test.ts"));
    }

    #[test]
    fn exclusion_patterns_remove_files() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("src/app.ts"));
        touch(&dir.path().join("dist/bundle.js"));

        let mut settings = AnalysisSettings::default();
        settings.exclusions = vec!["dist/**".to_string()];

        let mut store = SourceFileStore::new();
        store.load(dir.path(), &settings).unwrap();

        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn hidden_and_node_modules_dirs_are_skipped() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("node_modules/pkg/index.js"));
        touch(&dir.path().join(".git/hook.js"));
        touch(&dir.path().join("src/app.js"));

        let mut store = SourceFileStore::new();
        store.load(dir.path(), &AnalysisSettings::default()).unwrap();

        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn second_load_fully_replaces_first() {
        let first = tempdir().unwrap();
        touch(&first.path().join("old.js"));
        let second = tempdir().unwrap();
        touch(&second.path().join("new.js"));

        let mut store = SourceFileStore::new();
        store.load(first.path(), &AnalysisSettings::default()).unwrap();
        store.load(second.path(), &AnalysisSettings::default()).unwrap();

        let names = store.filenames().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("new.js"));
    }

    #[test]
    fn clear_resets_to_uninitialized() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.js"));

        let mut store = SourceFileStore::new();
        store.load(dir.path(), &AnalysisSettings::default()).unwrap();
        store.clear();

        assert!(!store.is_loaded());
        assert!(store.files().is_err());
    }

    #[test]
    fn invalid_exclusion_pattern_is_an_error() {
        let dir = tempdir().unwrap();
        let mut settings = AnalysisSettings::default();
        settings.exclusions = vec!["[".to_string()];

        let mut store = SourceFileStore::new();
        assert!(matches!(
            store.load(dir.path(), &settings),
            Err(StoreError::InvalidPattern { .. })
        ));
    }
}
