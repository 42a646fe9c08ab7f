//! Package manifest discovery and the per-directory manifest index
//!
//! The index answers "nearest enclosing package.json" and "all enclosing
//! package.json files" for any directory under the base. It is built strictly
//! parent-before-child so each directory's chain derives from its parent's in
//! O(1), giving O(D) total work for D directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use kansa_core::context::ManifestSummary;

use crate::error::StoreError;
use crate::events::{FsEvent, basename_lower};
use crate::files::{build_globset, matches_relative, normalize_root, project_walk};

pub const PACKAGE_JSON: &str = "package.json";

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    peer_dependencies: BTreeMap<String, String>,
}

/// A parsed package manifest. Lifetime: until the cache is invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub path: PathBuf,
    pub summary: ManifestSummary,
}

impl PackageManifest {
    pub fn parse(path: &Path, content: &str) -> Result<Self, serde_json::Error> {
        let raw: RawManifest = serde_json::from_str(content)?;
        let mut dependencies = std::collections::BTreeSet::new();
        dependencies.extend(raw.dependencies.into_keys());
        dependencies.extend(raw.dev_dependencies.into_keys());
        dependencies.extend(raw.peer_dependencies.into_keys());
        Ok(Self {
            path: path.to_path_buf(),
            summary: ManifestSummary {
                name: raw.name,
                dependencies,
            },
        })
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

/// Walks the base directory and parses every `package.json` (case-insensitive
/// basename). Unparseable manifests are skipped with a warning.
pub fn discover_package_manifests(
    base_dir: &Path,
    exclusions: &[String],
) -> Result<Vec<PackageManifest>, StoreError> {
    let base_dir = normalize_root(base_dir)?;
    let exclusions = build_globset(exclusions)?;

    let mut manifests = Vec::new();
    for entry in project_walk(&base_dir) {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() || basename_lower(entry.path()) != PACKAGE_JSON {
            continue;
        }
        if matches_relative(&exclusions, &base_dir, entry.path()) {
            continue;
        }
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to read package manifest");
                continue;
            }
        };
        match PackageManifest::parse(entry.path(), &content) {
            Ok(manifest) => manifests.push(manifest),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping invalid package manifest");
            }
        }
    }
    info!(count = manifests.len(), "discovered package manifests");
    Ok(manifests)
}

#[derive(Debug)]
struct ManifestIndex {
    base_dir: PathBuf,
    /// Directory → ordered chain of enclosing manifests, base to directory.
    chains: BTreeMap<PathBuf, Vec<Arc<PackageManifest>>>,
}

/// Process-scoped cache of package manifests and their per-directory index.
#[derive(Debug, Default)]
pub struct PackageMetadataStore {
    state: Option<ManifestIndex>,
}

impl PackageMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a snapshot, replacing any previous one.
    ///
    /// Directories are processed in parent-before-child order (ascending
    /// component depth), and every intermediate directory between the base and
    /// a manifest directory is indexed, so each chain is the parent's chain
    /// plus at most one manifest.
    pub fn set(&mut self, base_dir: &Path, manifests: Vec<PackageManifest>) {
        let base_dir = base_dir.to_path_buf();
        let manifests: Vec<Arc<PackageManifest>> = manifests
            .into_iter()
            .filter(|m| m.dir().starts_with(&base_dir))
            .map(Arc::new)
            .collect();

        let mut by_dir: BTreeMap<PathBuf, Arc<PackageManifest>> = BTreeMap::new();
        for manifest in &manifests {
            by_dir.insert(manifest.dir().to_path_buf(), Arc::clone(manifest));
        }

        // Every directory from the base down to each manifest directory.
        let mut dirs: Vec<PathBuf> = vec![base_dir.clone()];
        for dir in by_dir.keys() {
            let mut current = dir.clone();
            while current != base_dir && current.starts_with(&base_dir) {
                dirs.push(current.clone());
                if !current.pop() {
                    break;
                }
            }
        }
        dirs.sort_by_key(|d| (d.components().count(), d.clone()));
        dirs.dedup();

        let mut chains: BTreeMap<PathBuf, Vec<Arc<PackageManifest>>> = BTreeMap::new();
        for dir in dirs {
            let mut chain = dir
                .parent()
                .and_then(|parent| chains.get(parent))
                .cloned()
                .unwrap_or_default();
            if let Some(manifest) = by_dir.get(&dir) {
                chain.push(Arc::clone(manifest));
            }
            chains.insert(dir, chain);
        }

        debug!(directories = chains.len(), "manifest index rebuilt");
        self.state = Some(ManifestIndex { base_dir, chains });
    }

    pub fn clear(&mut self) {
        self.state = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Nearest enclosing manifest for a directory, or none.
    pub fn nearest(&self, dir: &Path) -> Result<Option<Arc<PackageManifest>>, StoreError> {
        Ok(self.chain(dir)?.last().cloned())
    }

    /// All enclosing manifests, ordered base to directory.
    pub fn all_enclosing(&self, dir: &Path) -> Result<Vec<Arc<PackageManifest>>, StoreError> {
        Ok(self.chain(dir)?.to_vec())
    }

    /// Drops the whole cache when the base directory changed or any event
    /// names a package manifest. Partial invalidation is unsafe because
    /// manifest chains would need re-deriving from the root anyway.
    pub fn invalidate_if_stale(&mut self, current_base_dir: &Path, events: &[FsEvent]) -> bool {
        let Some(index) = &self.state else {
            return false;
        };
        let base_changed = index.base_dir != current_base_dir;
        let manifest_event = events.iter().any(|e| e.basename_is(PACKAGE_JSON));
        if base_changed || manifest_event {
            debug!(base_changed, manifest_event, "dropping manifest index");
            self.state = None;
            return true;
        }
        false
    }

    fn chain(&self, dir: &Path) -> Result<&[Arc<PackageManifest>], StoreError> {
        let index = self
            .state
            .as_ref()
            .ok_or(StoreError::uninitialized("package metadata"))?;

        // Directories below the deepest indexed entry inherit the nearest
        // indexed ancestor's chain.
        let mut current = dir;
        loop {
            if let Some(chain) = index.chains.get(current) {
                return Ok(chain);
            }
            if !current.starts_with(&index.base_dir) {
                return Ok(&[]);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(&[]),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(path: &str, name: &str) -> PackageManifest {
        PackageManifest::parse(
            Path::new(path),
            &format!(r#"{{"name": "{name}", "dependencies": {{"react": "^18"}}}}"#),
        )
        .unwrap()
    }

    #[test]
    fn access_before_set_fails_with_uninitialized() {
        let store = PackageMetadataStore::new();
        assert!(matches!(
            store.nearest(Path::new("/a")),
            Err(StoreError::Uninitialized { .. })
        ));
    }

    #[test]
    fn nearest_prefers_deepest_enclosing_manifest() {
        let mut store = PackageMetadataStore::new();
        store.set(
            Path::new("/a"),
            vec![manifest("/a/package.json", "root"), manifest("/a/b/package.json", "sub")],
        );

        let nearest = store.nearest(Path::new("/a/b/c")).unwrap().unwrap();
        assert_eq!(nearest.summary.name.as_deref(), Some("sub"));

        let nearest = store.nearest(Path::new("/a/x")).unwrap().unwrap();
        assert_eq!(nearest.summary.name.as_deref(), Some("root"));
    }

    #[test]
    fn all_enclosing_is_ordered_base_to_directory() {
        let mut store = PackageMetadataStore::new();
        store.set(
            Path::new("/a"),
            vec![manifest("/a/package.json", "root"), manifest("/a/b/package.json", "sub")],
        );

        let chain = store.all_enclosing(Path::new("/a/b")).unwrap();
        let names: Vec<_> = chain
            .iter()
            .map(|m| m.summary.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["root", "sub"]);
    }

    #[test]
    fn directory_without_manifest_has_empty_chain() {
        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/a/b/package.json", "sub")]);

        assert!(store.nearest(Path::new("/a/x")).unwrap().is_none());
        assert!(store.all_enclosing(Path::new("/a/x")).unwrap().is_empty());
    }

    #[test]
    fn manifests_outside_base_are_ignored() {
        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/elsewhere/package.json", "out")]);

        assert!(store.nearest(Path::new("/a/b")).unwrap().is_none());
    }

    #[test]
    fn base_dir_change_invalidates_cache() {
        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/a/package.json", "root")]);

        assert!(store.invalidate_if_stale(Path::new("/b"), &[]));
        assert!(!store.is_initialized());
    }

    #[test]
    fn manifest_event_invalidates_cache_case_insensitively() {
        use crate::events::FsEventKind;

        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/a/package.json", "root")]);

        let events = [FsEvent::new("/a/b/Package.JSON", FsEventKind::Created)];
        assert!(store.invalidate_if_stale(Path::new("/a"), &events));
        assert!(!store.is_initialized());
    }

    #[test]
    fn unrelated_events_keep_cache_warm() {
        use crate::events::FsEventKind;

        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/a/package.json", "root")]);

        let events = [FsEvent::new("/a/b/index.ts", FsEventKind::Modified)];
        assert!(!store.invalidate_if_stale(Path::new("/a"), &events));
        assert!(store.is_initialized());
    }

    #[test]
    fn set_replaces_previous_snapshot() {
        let mut store = PackageMetadataStore::new();
        store.set(Path::new("/a"), vec![manifest("/a/package.json", "old")]);
        store.set(Path::new("/a"), vec![manifest("/a/package.json", "new")]);

        let nearest = store.nearest(Path::new("/a")).unwrap().unwrap();
        assert_eq!(nearest.summary.name.as_deref(), Some("new"));
    }

    #[test]
    fn manifest_parse_collects_all_dependency_kinds() {
        let manifest = PackageManifest::parse(
            Path::new("/p/package.json"),
            r#"{
                "name": "p",
                "dependencies": {"react": "^18"},
                "devDependencies": {"vitest": "^1"},
                "peerDependencies": {"vue": "^3"},
                "unknownField": true
            }"#,
        )
        .unwrap();

        assert!(manifest.summary.has_dependency("react"));
        assert!(manifest.summary.has_dependency("vitest"));
        assert!(manifest.summary.has_dependency("vue"));
    }

    #[test]
    fn discovery_finds_manifest_files() {
        use std::fs;
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "root"}"#).unwrap();
        fs::write(dir.path().join("pkg/package.json"), r#"{"name": "pkg"}"#).unwrap();
        fs::write(dir.path().join("pkg/other.json"), "{}").unwrap();

        let manifests = discover_package_manifests(dir.path(), &[]).unwrap();
        assert_eq!(manifests.len(), 2);
    }

    #[test]
    fn discovery_skips_invalid_json() {
        use std::fs;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "not json").unwrap();

        let manifests = discover_package_manifests(dir.path(), &[]).unwrap();
        assert!(manifests.is_empty());
    }
}
