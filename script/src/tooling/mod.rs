//! Editor tooling over resolved scripts.
//!
//! Every entry point is a read-only walk: the locator, the inlay hinter,
//! completion and signature help. Positions are zero-based line and byte
//! column, the same as [`crate::token::SourcePosition`].

mod completion;
mod hinter;
mod locator;
mod signature;

#[cfg(test)]
mod tests;

pub use completion::{CompletionItem, fuzzy_match};
pub use hinter::InlayHint;
pub use signature::SignatureHelp;

use crate::ast::{DeclKind, DeclRef};
use crate::context::Context;
use crate::env::SymbolKind;
use crate::script::Script;
use crate::types::TypeKind;

/// A declaration as presented to an editor.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub decl: DeclRef,
    pub name: String,
    /// Comment lines directly above the declaration
    pub comment: Option<String>,
    /// Printable type; the return type for functions
    pub type_name: String,
    pub kind: SymbolKind,
    /// Name of the script holding the declaration
    pub provider: String,
    /// Source text of the declaration
    pub view: String,
}

/// Symbol kind of a declaration.
pub fn decl_symbol_kind(kind: &DeclKind) -> SymbolKind {
    match kind {
        DeclKind::Var { .. } | DeclKind::DeclList(_) | DeclKind::Define { .. } => SymbolKind::Variable,
        DeclKind::Param { .. } => SymbolKind::Param,
        DeclKind::Function { .. } => SymbolKind::Function,
        DeclKind::Field { .. } => SymbolKind::Field,
        DeclKind::Variant { .. } => SymbolKind::Variant,
        DeclKind::Import { .. } | DeclKind::FromImport { .. } | DeclKind::Include { .. } => SymbolKind::Module,
        DeclKind::Struct { .. }
        | DeclKind::TypeAlias { .. }
        | DeclKind::Newtype { .. }
        | DeclKind::Opaque
        | DeclKind::Sum { .. } => SymbolKind::Type,
    }
}

impl Script {
    /// Describes a declaration, which may live in another script.
    pub fn declaration_to_symbol(&self, ctx: &Context, decl: DeclRef) -> SymbolInfo {
        let (owner, d) = ctx.declaration(decl);
        let types = ctx.types();
        let type_name = match types.kind(d.type_id) {
            Some(TypeKind::Function { ret, .. }) => types.name(*ret),
            _ => types.name(d.type_id),
        };
        SymbolInfo {
            decl,
            name: d.name.clone(),
            comment: d.comment.clone(),
            type_name,
            kind: decl_symbol_kind(&d.kind),
            provider: owner.name.clone(),
            view: owner.view_from_range(d.range).to_string(),
        }
    }
}
