//! Findings reported by rules
//!
//! A `Finding` is one reported issue at one location. Serializable so the
//! orchestrator can forward findings through its incremental channel.

use serde::Serialize;

use crate::rules::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

impl Finding {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        file: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_serializes_without_empty_end_fields() {
        let finding = Finding::new("K001", Severity::Warning, "msg", "a.js", 3, 7);
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["rule_id"], "K001");
        assert_eq!(json["line"], 3);
        assert!(json.get("end_line").is_none());
    }

    #[test]
    fn finding_with_end_carries_range() {
        let finding = Finding::new("K001", Severity::Error, "msg", "a.js", 1, 1).with_end(2, 5);
        assert_eq!(finding.end_line, Some(2));
        assert_eq!(finding.end_column, Some(5));
    }
}
