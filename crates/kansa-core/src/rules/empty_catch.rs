//! empty-catch rule (K002): catch clauses must not silently swallow errors
//!
//! A catch body containing only a comment is accepted when the
//! `allow_commented` option is set, since the comment documents intent.

use swc_ecma_ast::CatchClause;
use swc_ecma_visit::{Visit, VisitWith};

use crate::config::EmptyCatchOptions;
use crate::context::FileContext;
use crate::diagnostic::Finding;
use crate::parser::ParsedSource;
use crate::rules::{Rule, RuleMetadata, Severity};

pub struct EmptyCatch {
    metadata: RuleMetadata,
    options: EmptyCatchOptions,
}

impl EmptyCatch {
    pub fn new() -> Self {
        Self::with_options(EmptyCatchOptions::default())
    }

    pub fn with_options(options: EmptyCatchOptions) -> Self {
        Self {
            metadata: RuleMetadata {
                id: "K002",
                name: "empty-catch",
                description: "Handle the error or document why it is ignored",
                severity: Severity::Warning,
                main_only: false,
                requires_types: false,
            },
            options,
        }
    }
}

impl Default for EmptyCatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for EmptyCatch {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, file: &ParsedSource, _ctx: &FileContext<'_>) -> Vec<Finding> {
        let Some(module) = file.module() else {
            return Vec::new();
        };

        let mut visitor = CatchVisitor {
            file,
            allow_commented: self.options.allow_commented,
            findings: Vec::new(),
        };
        module.visit_with(&mut visitor);
        visitor.findings
    }
}

struct CatchVisitor<'a> {
    file: &'a ParsedSource,
    allow_commented: bool,
    findings: Vec<Finding>,
}

impl CatchVisitor<'_> {
    fn body_is_commented(&self, node: &CatchClause) -> bool {
        let lo = self.file.span_offset(node.body.span.lo.0);
        let hi = self.file.span_offset(node.body.span.hi.0);
        let source = self.file.source();
        if lo >= hi || hi > source.len() {
            return false;
        }
        // Body text between the braces; a comment marker means intent.
        let body = &source[lo..hi];
        body.contains("//") || body.contains("/*")
    }
}

impl Visit for CatchVisitor<'_> {
    fn visit_catch_clause(&mut self, node: &CatchClause) {
        node.visit_children_with(self);

        if !node.body.stmts.is_empty() {
            return;
        }
        if self.allow_commented && self.body_is_commented(node) {
            return;
        }

        let (line, column) = self
            .file
            .position(self.file.span_offset(node.span.lo.0));
        self.findings.push(Finding::new(
            "K002",
            Severity::Warning,
            "Handle this error or document why it is ignored",
            self.file.path(),
            line,
            column,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FileKind;
    use std::path::Path;

    fn check_with(code: &str, options: EmptyCatchOptions) -> Vec<Finding> {
        let file = ParsedSource::parse(Path::new("test.js"), code);
        EmptyCatch::with_options(options).check(&file, &FileContext::untyped(FileKind::Main))
    }

    #[test]
    fn reports_empty_catch() {
        let findings = check_with("try { f(); } catch (e) {}", EmptyCatchOptions::default());
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn handled_catch_is_fine() {
        let findings = check_with(
            "try { f(); } catch (e) { console.error(e); }",
            EmptyCatchOptions::default(),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn commented_catch_allowed_when_option_set() {
        let options = EmptyCatchOptions {
            allow_commented: true,
        };
        let findings = check_with("try { f(); } catch (e) { /* ignored */ }", options);
        assert!(findings.is_empty());
    }

    #[test]
    fn commented_catch_reported_by_default() {
        let findings = check_with(
            "try { f(); } catch (e) { /* ignored */ }",
            EmptyCatchOptions::default(),
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn nested_catches_are_each_checked() {
        let code = "try { f(); } catch (e) { try { g(); } catch (e2) {} }";
        let findings = check_with(code, EmptyCatchOptions::default());
        assert_eq!(findings.len(), 1);
    }
}
