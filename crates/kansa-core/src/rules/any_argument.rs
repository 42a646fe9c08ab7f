//! any-argument rule (K010): call arguments must not be typed `any`
//!
//! Needs the type-query interface of a built compilation unit. Without it the
//! rule never runs (the registry skips type-requiring rules on the untyped
//! path).

use std::path::Path;

use swc_common::Spanned;
use swc_ecma_ast::CallExpr;
use swc_ecma_visit::{Visit, VisitWith};

use crate::context::FileContext;
use crate::diagnostic::Finding;
use crate::parser::ParsedSource;
use crate::rules::{Rule, RuleMetadata, Severity};

pub struct AnyArgument {
    metadata: RuleMetadata,
}

impl AnyArgument {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "K010",
                name: "any-argument",
                description: "Type this argument instead of passing `any`",
                severity: Severity::Warning,
                main_only: false,
                requires_types: true,
            },
        }
    }
}

impl Default for AnyArgument {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for AnyArgument {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, file: &ParsedSource, ctx: &FileContext<'_>) -> Vec<Finding> {
        let (Some(module), Some(types)) = (file.module(), ctx.type_query) else {
            return Vec::new();
        };

        let mut visitor = CallVisitor {
            file,
            path: Path::new(file.path()).to_path_buf(),
            types,
            findings: Vec::new(),
        };
        module.visit_with(&mut visitor);
        visitor.findings
    }
}

struct CallVisitor<'a> {
    file: &'a ParsedSource,
    path: std::path::PathBuf,
    types: &'a dyn crate::context::TypeQuery,
    findings: Vec<Finding>,
}

impl Visit for CallVisitor<'_> {
    fn visit_call_expr(&mut self, node: &CallExpr) {
        node.visit_children_with(self);

        for arg in &node.args {
            let span = arg.expr.span();
            let Some(type_text) = self.types.type_of_span(&self.path, span.lo.0, span.hi.0) else {
                continue;
            };
            if type_text == "any" {
                let (line, column) = self
                    .file
                    .position(self.file.span_offset(span.lo.0));
                self.findings.push(Finding::new(
                    "K010",
                    Severity::Warning,
                    "Type this argument instead of passing `any`",
                    self.file.path(),
                    line,
                    column,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FileKind, TypeQuery};

    struct EverythingIsAny;

    impl TypeQuery for EverythingIsAny {
        fn type_of_span(&self, _file: &Path, _lo: u32, _hi: u32) -> Option<String> {
            Some("any".to_string())
        }
    }

    struct NothingKnown;

    impl TypeQuery for NothingKnown {
        fn type_of_span(&self, _file: &Path, _lo: u32, _hi: u32) -> Option<String> {
            None
        }
    }

    fn check(code: &str, types: &dyn TypeQuery) -> Vec<Finding> {
        let file = ParsedSource::parse(Path::new("test.ts"), code);
        let ctx = FileContext {
            kind: FileKind::Main,
            manifest: None,
            type_query: Some(types),
        };
        AnyArgument::new().check(&file, &ctx)
    }

    #[test]
    fn reports_any_typed_argument() {
        let findings = check("f(x);", &EverythingIsAny);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "K010");
    }

    #[test]
    fn declines_when_type_is_unknown() {
        let findings = check("f(x);", &NothingKnown);
        assert!(findings.is_empty());
    }

    #[test]
    fn no_call_no_finding() {
        let findings = check("const a = 1;", &EverythingIsAny);
        assert!(findings.is_empty());
    }
}
