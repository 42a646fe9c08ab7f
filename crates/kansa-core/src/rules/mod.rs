//! Rule system for code analysis
//!
//! Rules are AST-pattern matchers over a parsed file plus a per-file context.
//! The project orchestrator consumes the whole set through the opaque
//! `RuleSet` capability and never looks inside individual rules.

pub mod any_argument;
pub mod empty_catch;
pub mod no_debugger;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{RuleOptions, RulesConfig};
use crate::context::{FileContext, FileKind};
use crate::diagnostic::Finding;
use crate::parser::ParsedSource;

pub use any_argument::AnyArgument;
pub use empty_catch::EmptyCatch;
pub use no_debugger::NoDebugger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn level(&self) -> u8 {
        match self {
            Severity::Error => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    /// Rules that only make sense in production code; their findings are
    /// suppressed in TEST files by the filter pipeline.
    pub main_only: bool,
    /// Rules that decline to report without a type-query interface.
    pub requires_types: bool,
}

pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;
    fn check(&self, file: &ParsedSource, ctx: &FileContext<'_>) -> Vec<Finding>;
}

/// Why a single file could not be analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Parse,
    Rule,
    Io,
}

/// Failure raised while analyzing one file.
///
/// Recoverable failures are recorded as the file's outcome and the run
/// continues. Fatal failures signal environment exhaustion and abort the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisFailure {
    #[error("{message}")]
    Recoverable {
        kind: FailureKind,
        message: String,
        line: Option<usize>,
    },
    #[error("fatal: {message}")]
    Fatal { message: String },
}

impl AnalysisFailure {
    pub fn parse(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Recoverable {
            kind: FailureKind::Parse,
            message: message.into(),
            line,
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::Recoverable {
            kind: FailureKind::Rule,
            message: message.into(),
            line: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }
}

/// The opaque capability the orchestrator drives: given a parsed file and its
/// context, produce findings or fail.
pub trait RuleSet: Send + Sync {
    fn analyze(
        &self,
        file: &ParsedSource,
        ctx: &FileContext<'_>,
    ) -> Result<Vec<Finding>, AnalysisFailure>;
}

/// Post-processing step applied to every finding, in fixed order. Returning
/// `None` drops the finding.
pub type FindingFilter = fn(&RuleMetadata, &FileContext<'_>, Finding) -> Option<Finding>;

/// Suppresses findings of main-only rules inside test files.
pub fn suppress_main_only_in_tests(
    metadata: &RuleMetadata,
    ctx: &FileContext<'_>,
    finding: Finding,
) -> Option<Finding> {
    if metadata.main_only && ctx.kind == FileKind::Test {
        None
    } else {
        Some(finding)
    }
}

/// Drops findings whose location fell outside the file (zero line), which can
/// happen when a recovered AST carries dummy spans.
pub fn drop_unlocated(
    _metadata: &RuleMetadata,
    _ctx: &FileContext<'_>,
    finding: Finding,
) -> Option<Finding> {
    if finding.line == 0 { None } else { Some(finding) }
}

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    disabled: HashSet<String>,
    severity_overrides: HashMap<String, Severity>,
    filters: Vec<FindingFilter>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            disabled: HashSet::new(),
            severity_overrides: HashMap::new(),
            filters: vec![suppress_main_only_in_tests, drop_unlocated],
        }
    }

    /// Registry with the built-in rule set under default options.
    pub fn with_builtin_rules() -> Self {
        Self::with_builtin_rules_and_options(&RuleOptions::default())
    }

    /// Registry with the built-in rule set, constructed from resolved
    /// `[rules.options]` records.
    pub fn with_builtin_rules_and_options(options: &RuleOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NoDebugger::new()));
        registry.register(Box::new(EmptyCatch::with_options(
            options.empty_catch.clone(),
        )));
        registry.register(Box::new(AnyArgument::new()));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn configure(&mut self, config: &RulesConfig) {
        self.disabled = config.disabled.iter().cloned().collect();
        self.severity_overrides = config
            .severity
            .iter()
            .map(|(id, severity)| (id.clone(), *severity))
            .collect();
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn run_all(&self, file: &ParsedSource, ctx: &FileContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            let metadata = rule.metadata();
            if self.is_disabled(metadata) {
                continue;
            }
            if metadata.requires_types && !ctx.has_type_information() {
                continue;
            }
            for mut finding in rule.check(file, ctx) {
                if let Some(severity) = self.severity_override(metadata) {
                    finding.severity = severity;
                }
                if let Some(finding) = self.apply_filters(metadata, ctx, finding) {
                    findings.push(finding);
                }
            }
        }
        findings
    }

    fn is_disabled(&self, metadata: &RuleMetadata) -> bool {
        self.disabled.contains(metadata.id) || self.disabled.contains(metadata.name)
    }

    fn severity_override(&self, metadata: &RuleMetadata) -> Option<Severity> {
        self.severity_overrides
            .get(metadata.id)
            .or_else(|| self.severity_overrides.get(metadata.name))
            .copied()
    }

    fn apply_filters(
        &self,
        metadata: &RuleMetadata,
        ctx: &FileContext<'_>,
        finding: Finding,
    ) -> Option<Finding> {
        let mut current = finding;
        for filter in &self.filters {
            current = filter(metadata, ctx, current)?;
        }
        Some(current)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl RuleSet for RuleRegistry {
    fn analyze(
        &self,
        file: &ParsedSource,
        ctx: &FileContext<'_>,
    ) -> Result<Vec<Finding>, AnalysisFailure> {
        Ok(self.run_all(file, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(code: &str) -> ParsedSource {
        ParsedSource::parse(Path::new("test.js"), code)
    }

    #[test]
    fn builtin_registry_reports_debugger_statement() {
        let registry = RuleRegistry::with_builtin_rules();
        let file = parse("debugger;");
        let ctx = FileContext::untyped(FileKind::Main);

        let findings = registry.run_all(&file, &ctx);

        assert!(
            findings.iter().any(|f| f.rule_id == "K001"),
            "Expected K001 for debugger statement"
        );
    }

    #[test]
    fn builtin_registry_honors_resolved_rule_options() {
        use crate::config::EmptyCatchOptions;

        let options = RuleOptions {
            empty_catch: EmptyCatchOptions {
                allow_commented: true,
            },
        };
        let registry = RuleRegistry::with_builtin_rules_and_options(&options);

        let file = parse("try { f(); } catch (e) { /* ignored */ }");
        let findings = registry.run_all(&file, &FileContext::untyped(FileKind::Main));

        assert!(
            !findings.iter().any(|f| f.rule_id == "K002"),
            "allow_commented option must reach the constructed rule"
        );
    }

    #[test]
    fn disabled_rule_produces_no_findings() {
        let mut registry = RuleRegistry::with_builtin_rules();
        let config = RulesConfig {
            disabled: vec!["no-debugger".to_string()],
            ..Default::default()
        };
        registry.configure(&config);

        let file = parse("debugger;");
        let findings = registry.run_all(&file, &FileContext::untyped(FileKind::Main));

        assert!(!findings.iter().any(|f| f.rule_id == "K001"));
    }

    #[test]
    fn severity_override_applies_to_findings() {
        let mut registry = RuleRegistry::with_builtin_rules();
        let config = RulesConfig {
            severity: [("K001".to_string(), Severity::Info)].into_iter().collect(),
            ..Default::default()
        };
        registry.configure(&config);

        let file = parse("debugger;");
        let findings = registry.run_all(&file, &FileContext::untyped(FileKind::Main));

        let finding = findings.iter().find(|f| f.rule_id == "K001").unwrap();
        assert_eq!(finding.severity, Severity::Info);
    }

    #[test]
    fn main_only_rules_are_suppressed_in_test_files() {
        let registry = RuleRegistry::with_builtin_rules();
        let file = parse("debugger;");

        let main_findings = registry.run_all(&file, &FileContext::untyped(FileKind::Main));
        let test_findings = registry.run_all(&file, &FileContext::untyped(FileKind::Test));

        assert!(main_findings.iter().any(|f| f.rule_id == "K001"));
        assert!(!test_findings.iter().any(|f| f.rule_id == "K001"));
    }

    #[test]
    fn type_requiring_rules_are_skipped_without_type_query() {
        let registry = RuleRegistry::with_builtin_rules();
        let file = parse("f(x);");
        let findings = registry.run_all(&file, &FileContext::untyped(FileKind::Main));

        assert!(!findings.iter().any(|f| f.rule_id == "K010"));
    }
}
