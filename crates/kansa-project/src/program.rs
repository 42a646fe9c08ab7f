//! Compilation unit construction
//!
//! A descriptor (tsconfig.json) is resolved into the concrete set of
//! discovered files it covers, then handed to the external type-checking
//! engine for a type-query interface. Engine failures are recovered locally:
//! the unit comes back tagged failed and its files take the untyped path.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use kansa_core::context::TypeQuery;

use crate::error::BuildError;
use crate::files::SourceFile;

/// The external type-checking capability: given a resolved compilation-unit
/// descriptor, produce a per-file type-query interface.
///
/// Implementations for distinct descriptors touch disjoint state, so units can
/// be built independently without locking.
pub trait TypeCheckEngine: Send + Sync {
    /// Maximum TypeScript language version the engine supports; recorded in
    /// unit-build warnings to help diagnose version mismatches.
    fn max_supported_version(&self) -> &str;

    fn create_type_query(
        &self,
        descriptor: &Path,
        files: &[PathBuf],
    ) -> Result<Box<dyn TypeQuery>, EngineError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// In-tree engine that resolves file sets but answers no type queries; rules
/// needing type information decline to report under it.
#[derive(Debug, Default)]
pub struct SyntacticEngine;

struct NoTypeInformation;

impl TypeQuery for NoTypeInformation {
    fn type_of_span(&self, _file: &Path, _lo: u32, _hi: u32) -> Option<String> {
        None
    }
}

impl TypeCheckEngine for SyntacticEngine {
    fn max_supported_version(&self) -> &str {
        "5.9"
    }

    fn create_type_query(
        &self,
        _descriptor: &Path,
        _files: &[PathBuf],
    ) -> Result<Box<dyn TypeQuery>, EngineError> {
        Ok(Box::new(NoTypeInformation))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDescriptor {
    extends: Option<String>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    references: Vec<RawReference>,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    path: String,
}

/// Descriptor content after following its inheritance chain.
#[derive(Debug)]
struct ResolvedDescriptor {
    dir: PathBuf,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    references: Vec<PathBuf>,
}

enum UnitStatus {
    Built(Box<dyn TypeQuery>),
    Failed { reason: String },
}

/// A compilation unit: the files one descriptor type-checks, plus the
/// type-query handle when construction succeeded.
pub struct CompilationUnit {
    pub descriptor: PathBuf,
    /// Sorted covered files. Empty for failed units; their nominal files stay
    /// unassigned and are analyzed untyped.
    pub files: Vec<PathBuf>,
    /// Referenced descriptor paths, for the scheduler to chase.
    pub references: Vec<PathBuf>,
    status: UnitStatus,
}

impl CompilationUnit {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            UnitStatus::Failed { reason } => Some(reason),
            UnitStatus::Built(_) => None,
        }
    }

    pub fn type_query(&self) -> Option<&dyn TypeQuery> {
        match &self.status {
            UnitStatus::Built(query) => Some(query.as_ref()),
            UnitStatus::Failed { .. } => None,
        }
    }

    fn failed(descriptor: &Path, reason: String) -> Self {
        Self {
            descriptor: descriptor.to_path_buf(),
            files: Vec::new(),
            references: Vec::new(),
            status: UnitStatus::Failed { reason },
        }
    }
}

/// Builds compilation units, at most once per descriptor per run.
pub struct CompilationUnitBuilder<'a> {
    engine: &'a dyn TypeCheckEngine,
    built: HashSet<PathBuf>,
}

impl<'a> CompilationUnitBuilder<'a> {
    pub fn new(engine: &'a dyn TypeCheckEngine) -> Self {
        Self {
            engine,
            built: HashSet::new(),
        }
    }

    pub fn engine(&self) -> &dyn TypeCheckEngine {
        self.engine
    }

    pub fn build(
        &mut self,
        descriptor: &Path,
        discovered: &BTreeMap<PathBuf, SourceFile>,
    ) -> CompilationUnit {
        if !self.built.insert(descriptor.to_path_buf()) {
            return CompilationUnit::failed(
                descriptor,
                "descriptor already built this run".to_string(),
            );
        }

        let resolved = match resolve_descriptor(descriptor) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(descriptor = %descriptor.display(), error = %e, "descriptor resolution failed");
                return CompilationUnit::failed(descriptor, e.to_string());
            }
        };

        let files = match covered_files(&resolved, discovered) {
            Ok(files) => files,
            Err(e) => {
                return CompilationUnit::failed(descriptor, e.to_string());
            }
        };

        match self.engine.create_type_query(descriptor, &files) {
            Ok(query) => {
                debug!(
                    descriptor = %descriptor.display(),
                    files = files.len(),
                    "compilation unit built"
                );
                CompilationUnit {
                    descriptor: descriptor.to_path_buf(),
                    files,
                    references: resolved.references,
                    status: UnitStatus::Built(query),
                }
            }
            Err(e) => {
                warn!(descriptor = %descriptor.display(), error = %e, "type-query construction failed");
                CompilationUnit::failed(descriptor, e.to_string())
            }
        }
    }
}

fn resolve_descriptor(path: &Path) -> Result<ResolvedDescriptor, BuildError> {
    let mut visited = HashSet::new();
    resolve_chain(path, &mut visited)
}

fn resolve_chain(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<ResolvedDescriptor, BuildError> {
    if !visited.insert(path.to_path_buf()) {
        return Err(BuildError::ExtendsCycle {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| BuildError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: RawDescriptor =
        serde_json::from_str(&content).map_err(|e| BuildError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let references = raw
        .references
        .iter()
        .map(|r| resolve_reference(&dir, &r.path))
        .collect();

    let mut resolved = ResolvedDescriptor {
        dir: dir.clone(),
        files: raw.files,
        include: raw.include,
        exclude: raw.exclude,
        references,
    };

    // Inherited fields are only defaults; the extending descriptor wins.
    // References are not inherited.
    if let Some(extends) = raw.extends {
        let parent_path = resolve_extends_target(&dir, &extends);
        let parent = resolve_chain(&parent_path, visited)?;
        resolved.files = resolved.files.or(parent.files);
        resolved.include = resolved.include.or(parent.include);
        resolved.exclude = resolved.exclude.or(parent.exclude);
    }

    Ok(resolved)
}

fn resolve_extends_target(dir: &Path, extends: &str) -> PathBuf {
    let mut target = dir.join(extends);
    if target.extension().is_none() {
        target.set_extension("json");
    }
    target
}

fn resolve_reference(dir: &Path, reference: &str) -> PathBuf {
    let target = dir.join(reference);
    if target.is_dir() {
        target.join(crate::tsconfig::TSCONFIG_JSON)
    } else {
        target
    }
}

fn covered_files(
    resolved: &ResolvedDescriptor,
    discovered: &BTreeMap<PathBuf, SourceFile>,
) -> Result<Vec<PathBuf>, BuildError> {
    // An explicit file list wins over include globs.
    if let Some(files) = &resolved.files {
        let mut covered = Vec::new();
        for file in files {
            let path = absolute_in(&resolved.dir, file);
            if discovered.contains_key(&path) {
                covered.push(path);
            }
        }
        covered.sort();
        return Ok(covered);
    }

    let include = build_descriptor_globs(
        resolved.include.as_deref().unwrap_or(&["**/*".to_string()]),
        &resolved.dir,
    )?;
    let exclude = build_descriptor_globs(resolved.exclude.as_deref().unwrap_or(&[]), &resolved.dir)?;

    let mut covered: Vec<PathBuf> = discovered
        .keys()
        .filter(|path| {
            let relative = path.strip_prefix(&resolved.dir).ok();
            include.matches(path, relative) && !exclude.matches(path, relative)
        })
        .cloned()
        .collect();
    covered.sort();
    Ok(covered)
}

fn absolute_in(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

/// Relative patterns match against the candidate path relative to the
/// descriptor directory; absolute patterns (as written by a synthesized
/// whole-root descriptor) match against the full candidate path.
struct DescriptorGlobs {
    relative: GlobSet,
    absolute: GlobSet,
}

impl DescriptorGlobs {
    fn matches(&self, path: &Path, relative: Option<&Path>) -> bool {
        if relative.is_some_and(|r| self.relative.is_match(r)) {
            return true;
        }
        self.absolute.is_match(path)
    }
}

/// tsconfig include/exclude entries may name a bare directory; treat those as
/// covering the whole subtree.
fn build_descriptor_globs(patterns: &[String], dir: &Path) -> Result<DescriptorGlobs, BuildError> {
    let mut relative = GlobSetBuilder::new();
    let mut absolute = GlobSetBuilder::new();
    for pattern in patterns {
        let builder = if Path::new(pattern).is_absolute() {
            &mut absolute
        } else {
            &mut relative
        };
        for expanded in [pattern.clone(), format!("{pattern}/**")] {
            let glob = Glob::new(&expanded).map_err(|e| BuildError::Parse {
                path: dir.to_path_buf(),
                message: format!("invalid glob '{pattern}': {e}"),
            })?;
            builder.add(glob);
        }
    }
    let build = |builder: GlobSetBuilder| {
        builder.build().map_err(|e| BuildError::Parse {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })
    };
    Ok(DescriptorGlobs {
        relative: build(relative)?,
        absolute: build(absolute)?,
    })
}
