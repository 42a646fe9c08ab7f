//! Parser module for JavaScript/TypeScript source code
//!
//! Wraps SWC's error-recovering module parser. A file is always parsed into a
//! `ParsedSource`; syntax errors are collected alongside whatever AST could be
//! recovered so that rules can still run on partially valid input.

use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap, Spanned};
use swc_ecma_parser::{EsSyntax, Syntax, TsSyntax, parse_file_as_module};

pub use swc_ecma_ast::{EsVersion, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

/// Extensions routed to the analyzer. Anything else is skipped at discovery.
pub const JS_TS_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

pub fn is_js_ts_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JS_TS_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn detect_language(path: &Path) -> Language {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "jsx" => Language::Jsx,
        _ => Language::JavaScript,
    }
}

fn syntax_for(language: Language) -> Syntax {
    match language {
        Language::JavaScript => Syntax::Es(EsSyntax::default()),
        Language::Jsx => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
        Language::TypeScript => Syntax::Typescript(TsSyntax::default()),
        Language::Tsx => Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        }),
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct SyntaxIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A parsed source file: recovered AST plus collected syntax errors.
pub struct ParsedSource {
    path: String,
    language: Language,
    source: String,
    module: Option<Module>,
    issues: Vec<SyntaxIssue>,
    start_pos: u32,
    line_ranges: OnceLock<Vec<Range<usize>>>,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("has_module", &self.module.is_some())
            .field("issue_count", &self.issues.len())
            .finish()
    }
}

impl ParsedSource {
    pub fn parse(path: &Path, source: &str) -> Self {
        let language = detect_language(path);
        let source_map: Lrc<SourceMap> = Default::default();
        let fm = source_map.new_source_file(
            FileName::Real(path.to_path_buf()).into(),
            source.to_string(),
        );

        let start_pos = fm.start_pos.0;
        let mut recovered = Vec::new();
        let result = parse_file_as_module(
            &fm,
            syntax_for(language),
            EsVersion::latest(),
            None,
            &mut recovered,
        );

        let mut issues: Vec<SyntaxIssue> = recovered
            .into_iter()
            .map(|e| to_issue(&source_map, e.span(), e.kind().msg().to_string()))
            .collect();

        let module = match result {
            Ok(module) => Some(module),
            Err(e) => {
                issues.push(to_issue(&source_map, e.span(), e.kind().msg().to_string()));
                None
            }
        };

        Self {
            path: path.to_string_lossy().into_owned(),
            language,
            source: source.to_string(),
            module,
            issues,
            start_pos,
            line_ranges: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn issues(&self) -> &[SyntaxIssue] {
        &self.issues
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// 1-based line lookup into the original source.
    pub fn line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 {
            return None;
        }
        let ranges = self.line_ranges.get_or_init(|| build_line_ranges(&self.source));
        ranges
            .get(line_number - 1)
            .map(|range| &self.source[range.clone()])
    }

    /// Maps an AST span position (a SWC `BytePos` value) to a source offset.
    pub fn span_offset(&self, pos: u32) -> usize {
        pos.saturating_sub(self.start_pos) as usize
    }

    /// Maps a byte offset to a (line, column) pair, both 1-based.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let ranges = self.line_ranges.get_or_init(|| build_line_ranges(&self.source));
        for (i, range) in ranges.iter().enumerate() {
            if offset <= range.end {
                return (i + 1, offset.saturating_sub(range.start) + 1);
            }
        }
        (ranges.len().max(1), 1)
    }
}

fn to_issue(source_map: &SourceMap, span: swc_common::Span, message: String) -> SyntaxIssue {
    let loc = source_map.lookup_char_pos(span.lo);
    SyntaxIssue {
        line: loc.line,
        column: loc.col_display + 1,
        message,
    }
}

fn build_line_ranges(source: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;

    for (i, c) in source.char_indices() {
        if c == '\n' {
            ranges.push(start..i);
            start = i + 1;
        }
    }
    if start < source.len() || (start == 0 && !source.is_empty()) {
        ranges.push(start..source.len());
    }
    ranges
}
