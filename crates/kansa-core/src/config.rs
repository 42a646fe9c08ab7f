//! Configuration loading and parsing for Kansa
//!
//! Loads `kansa.toml`. Per-rule options are typed records with declared
//! defaults, validated when the file is loaded rather than when a rule first
//! reads them; unknown keys produce warnings instead of being silently kept.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::rules::Severity;

pub const CONFIG_FILENAME: &str = "kansa.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["analysis", "rules"];
const KNOWN_ANALYSIS_KEYS: &[&str] = &[
    "exclude",
    "test_patterns",
    "max_files_for_type_checking",
    "lenient",
];
const KNOWN_RULES_KEYS: &[&str] = &["disabled", "severity", "options"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid options for rule '{rule}' in '{path}': {message}")]
    RuleOptions {
        path: PathBuf,
        rule: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
    /// Typed option records resolved from `[rules.options]`.
    pub rule_options: RuleOptions,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns excluded from discovery, on top of the built-in skips.
    pub exclude: Vec<String>,
    /// Glob patterns classifying a file as TEST instead of MAIN.
    pub test_patterns: Vec<String>,
    /// Above this file count no compilation unit is synthesized and files are
    /// analyzed without type information.
    pub max_files_for_type_checking: usize,
    /// Whether a synthesized unit covers the whole root instead of the exact
    /// discovered file list.
    pub lenient: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            test_patterns: vec![
                "**/*.test.*".to_string(),
                "**/*.spec.*".to_string(),
                "**/__tests__/**".to_string(),
            ],
            max_files_for_type_checking: 20_000,
            lenient: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub disabled: Vec<String>,
    #[serde(default)]
    pub severity: HashMap<String, Severity>,
    /// Raw per-rule option tables, resolved into typed records by
    /// `RuleOptions::resolve`.
    #[serde(default)]
    pub options: HashMap<String, toml::Table>,
}

/// Typed option records for the rules that take options. Every field has a
/// declared default; unknown keys are rejected at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOptions {
    pub empty_catch: EmptyCatchOptions,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EmptyCatchOptions {
    /// Accept empty catch bodies that carry a comment.
    pub allow_commented: bool,
}

impl RuleOptions {
    /// Validates and resolves the raw option tables from `[rules.options]`.
    pub fn resolve(config: &RulesConfig, config_path: &Path) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        for (rule, table) in &config.options {
            match rule.as_str() {
                "empty-catch" | "K002" => {
                    options.empty_catch =
                        parse_rule_options(table, config_path, rule)?;
                }
                other => {
                    return Err(ConfigError::RuleOptions {
                        path: config_path.to_path_buf(),
                        rule: other.to_string(),
                        message: "rule does not take options".to_string(),
                    });
                }
            }
        }
        Ok(options)
    }
}

fn parse_rule_options<T: serde::de::DeserializeOwned>(
    table: &toml::Table,
    config_path: &Path,
    rule: &str,
) -> Result<T, ConfigError> {
    table
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::RuleOptions {
            path: config_path.to_path_buf(),
            rule: rule.to_string(),
            message: e.message().to_string(),
        })
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let raw: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let mut warnings = Vec::new();
    collect_unknown_keys(&raw, KNOWN_TOP_LEVEL_KEYS, "", &mut warnings);
    if let Some(toml::Value::Table(analysis)) = raw.get("analysis") {
        collect_unknown_keys(analysis, KNOWN_ANALYSIS_KEYS, "analysis.", &mut warnings);
    }
    if let Some(toml::Value::Table(rules)) = raw.get("rules") {
        collect_unknown_keys(rules, KNOWN_RULES_KEYS, "rules.", &mut warnings);
    }

    let config: Config = raw.try_into().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let rule_options = RuleOptions::resolve(&config.rules, path)?;

    Ok(ConfigResult {
        config,
        warnings,
        rule_options,
    })
}

/// Loads the nearest config, or falls back to defaults when none exists.
pub fn load_config_or_default(start_dir: &Path) -> ConfigResult {
    match find_config_file(start_dir) {
        Some(path) => match load_config_with_warnings(&path) {
            Ok(result) => result,
            Err(e) => ConfigResult {
                config: Config::default(),
                warnings: vec![format!("{e}; using default configuration")],
                rule_options: RuleOptions::default(),
            },
        },
        None => ConfigResult::default(),
    }
}

fn collect_unknown_keys(
    table: &toml::Table,
    known: &[&str],
    prefix: &str,
    warnings: &mut Vec<String>,
) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            warnings.push(format!("unknown configuration key '{prefix}{key}'"));
        }
    }
}
