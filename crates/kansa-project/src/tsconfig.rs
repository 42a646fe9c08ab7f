//! Project descriptor (tsconfig.json) discovery and lazy iteration
//!
//! Descriptors are discovered in one walk and consumed lazily. When a project
//! has none, a single descriptor can be synthesized into a scratch file, but
//! only below the type-checking file ceiling: for huge descriptor-less
//! codebases the sequence yields nothing and files are analyzed untyped.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::events::{FsEvent, basename_lower};
use crate::files::{build_globset, matches_relative, normalize_root, project_walk};
use crate::settings::AnalysisSettings;

pub const TSCONFIG_JSON: &str = "tsconfig.json";

#[derive(Debug)]
struct LoadedConfigs {
    root: PathBuf,
    descriptors: Vec<PathBuf>,
}

/// Process-scoped cache of discovered compilation-unit descriptors.
#[derive(Debug, Default)]
pub struct ProjectConfigStore {
    state: Option<LoadedConfigs>,
    /// Guard keeping the synthesized descriptor alive for the store lifetime.
    scratch: Option<NamedTempFile>,
}

/// Finite, restartable descriptor sequence. Exhausted once; calling
/// `iter_descriptors` again produces a fresh sequence from scratch.
#[derive(Debug)]
pub struct DescriptorSequence {
    items: Vec<PathBuf>,
    next: usize,
}

impl Iterator for DescriptorSequence {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        let item = self.items.get(self.next).cloned()?;
        self.next += 1;
        Some(item)
    }
}

impl ProjectConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One walk collecting every `tsconfig.json`, in lexicographic order.
    pub fn load(&mut self, root: &Path, settings: &AnalysisSettings) -> Result<(), StoreError> {
        let root = normalize_root(root)?;
        let exclusions = build_globset(&settings.exclusions)?;

        let mut descriptors = Vec::new();
        for entry in project_walk(&root) {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() || entry.file_name() != TSCONFIG_JSON {
                continue;
            }
            if matches_relative(&exclusions, &root, entry.path()) {
                continue;
            }
            descriptors.push(entry.path().to_path_buf());
        }

        info!(count = descriptors.len(), "discovered project descriptors");
        self.state = Some(LoadedConfigs { root, descriptors });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.state = None;
        self.scratch = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.loaded()?.descriptors.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.loaded()?.descriptors.is_empty())
    }

    pub fn descriptors(&self) -> Result<&[PathBuf], StoreError> {
        Ok(&self.loaded()?.descriptors)
    }

    /// Produces the descriptor sequence for one scheduling pass.
    ///
    /// Every discovered descriptor is yielded first; real project
    /// configuration always takes priority over synthesis. If none were
    /// discovered and the candidate file count is below the threshold, exactly
    /// one descriptor is synthesized: covering the whole root in lenient mode,
    /// or exactly the given files in strict mode. At or above the threshold
    /// the sequence yields nothing.
    pub fn iter_descriptors(
        &mut self,
        files: &[PathBuf],
        root: &Path,
        lenient: bool,
        max_files_threshold: usize,
    ) -> Result<DescriptorSequence, StoreError> {
        let discovered = self.loaded()?.descriptors.clone();
        if !discovered.is_empty() {
            return Ok(DescriptorSequence {
                items: discovered,
                next: 0,
            });
        }

        if files.len() >= max_files_threshold {
            debug!(
                files = files.len(),
                threshold = max_files_threshold,
                "no descriptors and too many files; analyzing without a program"
            );
            return Ok(DescriptorSequence {
                items: Vec::new(),
                next: 0,
            });
        }

        let synthesized = self.synthesize(files, root, lenient)?;
        info!(path = %synthesized.display(), "using synthesized descriptor");
        Ok(DescriptorSequence {
            items: vec![synthesized],
            next: 0,
        })
    }

    /// Case-insensitive `tsconfig*.json` basename match drops the descriptor
    /// list; a root change does the same.
    pub fn invalidate_if_stale(&mut self, current_root: &Path, events: &[FsEvent]) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let root_changed = state.root != current_root;
        let descriptor_event = events.iter().any(|e| {
            let name = basename_lower(&e.path);
            name.ends_with(".json") && name.contains("tsconfig")
        });
        if root_changed || descriptor_event {
            debug!(root_changed, descriptor_event, "dropping descriptor cache");
            self.state = None;
            self.scratch = None;
            return true;
        }
        false
    }

    fn synthesize(
        &mut self,
        files: &[PathBuf],
        root: &Path,
        lenient: bool,
    ) -> Result<PathBuf, StoreError> {
        let compiler_options = json!({
            "allowJs": true,
            "noImplicitAny": true,
        });
        let descriptor = if lenient {
            json!({
                "compilerOptions": compiler_options,
                "include": [format!("{}/**/*", root.display())],
            })
        } else {
            json!({
                "compilerOptions": compiler_options,
                "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            })
        };

        let mut file = tempfile::Builder::new()
            .prefix("tsconfig-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| StoreError::io("tsconfig scratch file", e))?;
        file.write_all(descriptor.to_string().as_bytes())
            .map_err(|e| StoreError::io(file.path().to_path_buf(), e))?;

        let path = file.path().to_path_buf();
        self.scratch = Some(file);
        Ok(path)
    }

    fn loaded(&self) -> Result<&LoadedConfigs, StoreError> {
        self.state
            .as_ref()
            .ok_or(StoreError::uninitialized("tsconfig"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn loaded_store(root: &Path) -> ProjectConfigStore {
        let mut store = ProjectConfigStore::new();
        store.load(root, &AnalysisSettings::default()).unwrap();
        store
    }

    #[test]
    fn access_before_load_fails_with_uninitialized() {
        let mut store = ProjectConfigStore::new();
        assert!(matches!(store.len(), Err(StoreError::Uninitialized { .. })));
        assert!(matches!(
            store.iter_descriptors(&[], Path::new("/p"), false, 10),
            Err(StoreError::Uninitialized { .. })
        ));
    }

    #[test]
    fn discovers_descriptors_in_order() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a/tsconfig.json"), "{}");
        write(&dir.path().join("b/tsconfig.json"), "{}");
        write(&dir.path().join("b/tsconfig.base.json"), "{}");

        let store = loaded_store(dir.path());
        let descriptors = store.descriptors().unwrap();

        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].starts_with(dir.path().join("a")));
        assert!(descriptors[1].starts_with(dir.path().join("b")));
    }

    #[test]
    fn discovered_descriptors_suppress_synthesis() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("tsconfig.json"), "{}");

        let mut store = loaded_store(dir.path());
        let files = vec![dir.path().join("a.ts")];
        let sequence: Vec<_> = store
            .iter_descriptors(&files, dir.path(), false, 10)
            .unwrap()
            .collect();

        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0], dir.path().join("tsconfig.json"));
    }

    #[test]
    fn synthesizes_one_descriptor_below_threshold() {
        let dir = tempdir().unwrap();
        let mut store = loaded_store(dir.path());

        let files = vec![dir.path().join("a.ts"), dir.path().join("b.ts")];
        let sequence: Vec<_> = store
            .iter_descriptors(&files, dir.path(), false, 10)
            .unwrap()
            .collect();

        assert_eq!(sequence.len(), 1);
        let content = fs::read_to_string(&sequence[0]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["files"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn lenient_synthesis_covers_the_whole_root() {
        let dir = tempdir().unwrap();
        let mut store = loaded_store(dir.path());

        let files = vec![dir.path().join("a.ts")];
        let sequence: Vec<_> = store
            .iter_descriptors(&files, dir.path(), true, 10)
            .unwrap()
            .collect();

        let content = fs::read_to_string(&sequence[0]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let include = parsed["include"][0].as_str().unwrap();
        assert!(include.ends_with("/**/*"));
        assert!(parsed.get("files").is_none());
    }

    #[test]
    fn yields_nothing_at_or_above_threshold() {
        let dir = tempdir().unwrap();
        let mut store = loaded_store(dir.path());

        let files: Vec<PathBuf> = (0..50).map(|i| dir.path().join(format!("f{i}.ts"))).collect();
        let sequence: Vec<_> = store
            .iter_descriptors(&files, dir.path(), false, 50)
            .unwrap()
            .collect();

        assert!(sequence.is_empty());
    }

    #[test]
    fn sequence_is_restartable_from_scratch() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("tsconfig.json"), "{}");

        let mut store = loaded_store(dir.path());
        let first: Vec<_> = store
            .iter_descriptors(&[], dir.path(), false, 10)
            .unwrap()
            .collect();
        let second: Vec<_> = store
            .iter_descriptors(&[], dir.path(), false, 10)
            .unwrap()
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn tsconfig_event_invalidates_cache() {
        use crate::events::FsEventKind;

        let dir = tempdir().unwrap();
        write(&dir.path().join("tsconfig.json"), "{}");
        let mut store = loaded_store(dir.path());

        let events = [FsEvent::new(
            dir.path().join("sub/TSConfig.app.JSON"),
            FsEventKind::Modified,
        )];
        assert!(store.invalidate_if_stale(dir.path(), &events));
        assert!(!store.is_loaded());
    }

    #[test]
    fn source_file_events_keep_cache_warm() {
        use crate::events::FsEventKind;

        let dir = tempdir().unwrap();
        let mut store = loaded_store(dir.path());

        let events = [FsEvent::new(dir.path().join("a.ts"), FsEventKind::Created)];
        assert!(!store.invalidate_if_stale(dir.path(), &events));
        assert!(store.is_loaded());
    }
}
