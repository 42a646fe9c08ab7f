//! no-debugger rule (K001): debugger statements must not ship in main code

use swc_ecma_ast::DebuggerStmt;
use swc_ecma_visit::{Visit, VisitWith};

use crate::context::FileContext;
use crate::diagnostic::Finding;
use crate::parser::ParsedSource;
use crate::rules::{Rule, RuleMetadata, Severity};

pub struct NoDebugger {
    metadata: RuleMetadata,
}

impl NoDebugger {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "K001",
                name: "no-debugger",
                description: "Remove debugger statements before shipping",
                severity: Severity::Error,
                main_only: true,
                requires_types: false,
            },
        }
    }
}

impl Default for NoDebugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for NoDebugger {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, file: &ParsedSource, _ctx: &FileContext<'_>) -> Vec<Finding> {
        let Some(module) = file.module() else {
            return Vec::new();
        };

        let mut visitor = DebuggerVisitor {
            file,
            findings: Vec::new(),
        };
        module.visit_with(&mut visitor);
        visitor.findings
    }
}

struct DebuggerVisitor<'a> {
    file: &'a ParsedSource,
    findings: Vec<Finding>,
}

impl Visit for DebuggerVisitor<'_> {
    fn visit_debugger_stmt(&mut self, node: &DebuggerStmt) {
        let (line, column) = self
            .file
            .position(self.file.span_offset(node.span.lo.0));
        self.findings.push(Finding::new(
            "K001",
            Severity::Error,
            "Remove this debugger statement",
            self.file.path(),
            line,
            column,
        ));
    }
}
