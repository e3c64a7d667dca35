//! A parsed script and its per-script state.

use std::rc::Rc;

use crate::ast::{Ast, ScriptId};
use crate::diagnostic::Diagnostics;
use crate::env::Exports;
use crate::token::{SourcePosition, SourceRange};

#[derive(Debug)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    pub text: String,
    pub ast: Ast,
    /// Everything reported so far, parse and resolve
    pub diagnostics: Diagnostics,
    pub(crate) parse_diagnostics: Diagnostics,
    /// Scripts pulled in with `#include`, in source order
    pub includes: Vec<ScriptId>,
    /// Own top-level symbols plus those of included scripts
    pub exports: Rc<Exports>,
    pub(crate) resolved: bool,
}

impl Script {
    pub(crate) fn new(id: ScriptId, name: String, text: String, ast: Ast, diagnostics: Diagnostics) -> Self {
        Self {
            id,
            name,
            text,
            ast,
            parse_diagnostics: diagnostics.clone(),
            diagnostics,
            includes: Vec::new(),
            exports: Rc::new(Exports::new()),
            resolved: false,
        }
    }

    pub fn errors(&self) -> usize {
        self.diagnostics.errors()
    }

    pub fn warnings(&self) -> usize {
        self.diagnostics.warnings()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Byte offset of the first character of each line.
    pub fn line_map(&self) -> &[usize] {
        &self.ast.line_map
    }

    /// Byte offset of a position, clamped to the text.
    pub fn offset_of(&self, pos: SourcePosition) -> usize {
        let line_start = match self.ast.line_map.get(pos.line) {
            Some(&start) => start,
            None => return self.text.len(),
        };
        (line_start + pos.column).min(self.text.len())
    }

    /// The source text covered by `range`.
    pub fn view_from_range(&self, range: SourceRange) -> &str {
        let start = self.offset_of(range.start);
        let end = self.offset_of(range.end).max(start);
        self.text.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    #[test]
    fn test_view_from_range() {
        let text = "int x;\nvoid main() {\n    x = 1;\n}\n";
        let (ast, diags) = parse("test", text, ParseOptions::default());
        let script = Script::new(ScriptId(0), "test".into(), text.into(), ast, diags);
        let range = SourceRange::new(SourcePosition::new(2, 4), SourcePosition::new(2, 9));
        assert_eq!(script.view_from_range(range), "x = 1");
        let past_end = SourceRange::new(SourcePosition::new(3, 0), SourcePosition::new(9, 0));
        assert_eq!(script.view_from_range(past_end), "}\n");
    }
}
