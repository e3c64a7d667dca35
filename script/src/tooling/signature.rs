//! Signature help inside call argument lists.

use crate::ast::{DeclKind, DeclRef, ExprKind};
use crate::context::Context;
use crate::printer::AstPrinter;
use crate::script::Script;
use crate::token::SourcePosition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHelp {
    pub decl: DeclRef,
    /// The function declaration without its body
    pub label: String,
    /// Each parameter as written
    pub parameters: Vec<String>,
    pub active_parameter: usize,
}

impl Script {
    /// Help for the innermost call whose argument list holds `line`:`column`.
    pub fn signature_help(&self, ctx: &Context, line: usize, column: usize) -> Option<SignatureHelp> {
        let pos = SourcePosition::new(line, column);
        let (callee, commas) = self
            .ast
            .exprs
            .iter()
            .filter(|e| e.range.contains(pos))
            .filter_map(|e| match &e.kind {
                ExprKind::Call {
                    callee, commas, open, ..
                } if pos > *open => Some((e.range.start, *open, *callee, commas)),
                _ => None,
            })
            .max_by_key(|&(start, open, ..)| (start, open))
            .map(|(_, _, callee, commas)| (callee, commas))?;

        let decl = self.ast.expr(callee).decl?;
        let (owner, function) = ctx.declaration(decl);
        let DeclKind::Function { params, .. } = &function.kind else {
            return None;
        };
        let parameters = params
            .iter()
            .map(|&p| owner.view_from_range(owner.ast.decl(p).range).to_string())
            .collect();
        Some(SignatureHelp {
            decl,
            label: AstPrinter::signature(&owner.ast, decl.id),
            parameters,
            active_parameter: commas.iter().filter(|&&c| c < pos).count(),
        })
    }
}
