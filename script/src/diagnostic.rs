//! Diagnostics produced while lexing, parsing and resolving.

use std::fmt;

use crate::token::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticType {
    Lexical,
    Parse,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticType,
    pub severity: Severity,
    /// Name of the script the diagnostic belongs to
    pub script: String,
    pub message: String,
    pub range: SourceRange,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        write!(
            f,
            "{}:{}: {}: {}",
            self.script, self.range.start, severity, self.message
        )
    }
}

/// Per-script diagnostic collector with an error budget.
///
/// Once `limit` errors have been recorded, further diagnostics of any
/// severity are dropped.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    script: String,
    limit: usize,
    list: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new(script: impl Into<String>, limit: usize) -> Self {
        Self {
            script: script.into(),
            limit,
            ..Default::default()
        }
    }

    pub fn error(&mut self, kind: DiagnosticType, message: impl Into<String>, range: SourceRange) {
        self.push(kind, Severity::Error, message.into(), range);
    }

    pub fn warning(&mut self, kind: DiagnosticType, message: impl Into<String>, range: SourceRange) {
        self.push(kind, Severity::Warning, message.into(), range);
    }

    fn push(&mut self, kind: DiagnosticType, severity: Severity, message: String, range: SourceRange) {
        if self.limit_reached() {
            return;
        }
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            _ => {}
        }
        self.list.push(Diagnostic {
            kind,
            severity,
            script: self.script.clone(),
            message,
            range,
        });
    }

    pub fn limit_reached(&self) -> bool {
        self.limit > 0 && self.errors >= self.limit
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_budget() {
        let mut diags = Diagnostics::new("test", 2);
        for _ in 0..5 {
            diags.error(DiagnosticType::Parse, "bad", SourceRange::default());
        }
        diags.warning(DiagnosticType::Semantic, "late", SourceRange::default());
        assert_eq!(diags.errors(), 2);
        assert_eq!(diags.len(), 2);
        assert!(diags.limit_reached());
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new("nw_s0_fireball", 20);
        diags.warning(DiagnosticType::Semantic, "unused", SourceRange::default());
        assert_eq!(
            diags.as_slice()[0].to_string(),
            "nw_s0_fireball:1:1: warning: unused"
        );
    }
}
