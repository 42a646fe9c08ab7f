//! Per-file analysis context handed to rules
//!
//! Bundles everything a rule may consult besides the AST: the file kind,
//! dependency metadata from the nearest enclosing package manifest, and the
//! type-query capability when the file belongs to a built compilation unit.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Classification of a source file, decided at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileKind {
    Main,
    Test,
}

/// Dependency-relevant projection of a package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub name: Option<String>,
    pub dependencies: BTreeSet<String>,
}

impl ManifestSummary {
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains(name)
    }
}

/// Type-level questions answerable once a compilation unit is built.
///
/// Implementations come from the external type-checking engine. An engine that
/// cannot answer (or a file outside any unit) simply returns `None`; rules
/// needing type information decline to report in that case.
pub trait TypeQuery {
    /// Textual type of the expression spanning the given byte range, if known.
    fn type_of_span(&self, file: &Path, lo: u32, hi: u32) -> Option<String>;
}

/// Context for analyzing one file.
pub struct FileContext<'a> {
    pub kind: FileKind,
    pub manifest: Option<&'a ManifestSummary>,
    pub type_query: Option<&'a dyn TypeQuery>,
}

impl<'a> FileContext<'a> {
    pub fn untyped(kind: FileKind) -> Self {
        Self {
            kind,
            manifest: None,
            type_query: None,
        }
    }

    pub fn has_type_information(&self) -> bool {
        self.type_query.is_some()
    }
}
