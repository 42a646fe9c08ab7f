//! Run-scoped analysis settings
//!
//! Everything the caller can vary per run: exclusions, test classification,
//! the synthesis ceiling, lenient mode and the in-memory content map used by
//! editor-driven analysis where disk content is stale.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use kansa_core::config::AnalysisConfig;

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Glob patterns excluded from every discovery walk.
    pub exclusions: Vec<String>,
    /// Glob patterns classifying files as TEST instead of MAIN.
    pub test_patterns: Vec<String>,
    /// Above this discovered-file count, no compilation unit is synthesized
    /// and descriptor-less projects are analyzed without type information.
    pub max_files_for_type_checking: usize,
    /// Lenient mode synthesizes a unit covering the whole root; strict mode
    /// covers exactly the discovered files.
    pub lenient: bool,
    /// Per-file content overriding what is on disk.
    pub in_memory: HashMap<PathBuf, String>,
    /// Wall-clock interval between progress reports.
    pub progress_interval: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            exclusions: config.exclude.clone(),
            test_patterns: config.test_patterns.clone(),
            max_files_for_type_checking: config.max_files_for_type_checking,
            lenient: config.lenient,
            in_memory: HashMap::new(),
            progress_interval: Duration::from_secs(10),
        }
    }

    pub fn with_in_memory_content(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.in_memory.insert(path.into(), content.to_string());
        self
    }
}
