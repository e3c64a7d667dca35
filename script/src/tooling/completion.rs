//! Completion from environment snapshots.

use std::rc::Rc;

use crate::ast::{DeclId, DeclKind, DeclRef, StmtKind};
use crate::context::Context;
use crate::env::{Env, Exports, Symbol, SymbolKind};
use crate::printer::AstPrinter;
use crate::script::Script;
use crate::token::SourcePosition;
use crate::types::TypeId;

use super::decl_symbol_kind;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: SymbolKind,
    /// Signature for functions, type name otherwise
    pub detail: String,
    pub decl: Option<DeclRef>,
}

/// True if every character of `pattern` appears in `candidate` in order,
/// ignoring ASCII case.
pub fn fuzzy_match(pattern: &str, candidate: &str) -> bool {
    let mut rest = candidate.chars();
    pattern.chars().all(|p| rest.any(|c| c.eq_ignore_ascii_case(&p)))
}

impl Script {
    /// Names visible at `line`:`column` matching `prefix`. A prefix of the
    /// form `base.partial` completes the members of `base` instead.
    pub fn complete_at(
        &self,
        ctx: &Context,
        prefix: &str,
        line: usize,
        column: usize,
        no_filter: bool,
    ) -> Vec<CompletionItem> {
        let env = self.env_at(ctx, SourcePosition::new(line, column));
        let (symbols, partial) = match prefix.rsplit_once('.') {
            Some((base, partial)) => (self.members_of(ctx, &env, base), partial),
            None => (env.iter().into_iter().cloned().collect(), prefix),
        };

        let mut items: Vec<CompletionItem> = symbols
            .into_iter()
            .filter(|s| no_filter || fuzzy_match(partial, &s.name))
            .map(|s| self.completion_item(ctx, &s))
            .collect();
        items.sort_by(|a, b| a.label.cmp(&b.label));
        items
    }

    /// The environment in effect just before `pos`.
    fn env_at(&self, ctx: &Context, pos: SourcePosition) -> Env {
        let ast = &self.ast;
        let block = ast
            .stmts
            .iter()
            .filter(|s| s.range.contains(pos))
            .filter_map(|s| match &s.kind {
                StmtKind::Block(children) => Some((s, children)),
                _ => None,
            })
            .max_by_key(|(s, _)| s.range.start);

        if let Some((block, children)) = block {
            if let Some(next) = children.iter().map(|&c| ast.stmt(c)).find(|c| c.range.start > pos) {
                if let Some(env) = &next.env {
                    return env.clone();
                }
            }
            if let Some(&last) = children.last() {
                let last = ast.stmt(last);
                if let Some(mut env) = last.env.clone() {
                    if let StmtKind::Decl(decl) = last.kind {
                        for symbol in self.declared_symbols(decl) {
                            env.push(symbol);
                        }
                    }
                    return env;
                }
            }
            if let Some(env) = &block.env {
                return env.clone();
            }
        }

        let mut visible = Exports::new();
        if let Some(command) = ctx.command_script() {
            visible.extend(command.exports.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        visible.extend(self.exports.iter().map(|(k, v)| (k.clone(), v.clone())));
        Env::with_outer(Rc::new(visible))
    }

    /// Symbols a local declaration statement binds.
    fn declared_symbols(&self, id: DeclId) -> Vec<Symbol> {
        let ids = match &self.ast.decl(id).kind {
            DeclKind::DeclList(items) => items.clone(),
            _ => vec![id],
        };
        ids.into_iter()
            .map(|id| {
                let decl = self.ast.decl(id);
                Symbol {
                    name: decl.name.clone(),
                    kind: decl_symbol_kind(&decl.kind),
                    decl: DeclRef { script: self.id, id },
                    type_id: decl.type_id,
                    signature: None,
                    is_constant: matches!(decl.kind, DeclKind::Var { is_const: true, .. }),
                }
            })
            .collect()
    }

    /// Exports of an imported module or fields of a struct value.
    fn members_of(&self, ctx: &Context, env: &Env, base: &str) -> Vec<Symbol> {
        let Some(symbol) = env.lookup(base.trim()) else {
            return Vec::new();
        };
        if symbol.kind == SymbolKind::Module {
            let (_, decl) = ctx.declaration(symbol.decl);
            let DeclKind::Import { path } = &decl.kind else {
                return Vec::new();
            };
            return ctx
                .script_by_name(&path.join("_"))
                .map(|module| module.exports.values().cloned().collect())
                .unwrap_or_default();
        }
        if symbol.type_id == TypeId::VECTOR {
            return ["x", "y", "z"]
                .into_iter()
                .map(|name| Symbol {
                    name: name.into(),
                    kind: SymbolKind::Field,
                    decl: symbol.decl,
                    type_id: TypeId::FLOAT,
                    signature: None,
                    is_constant: false,
                })
                .collect();
        }
        ctx.types()
            .struct_fields(symbol.type_id)
            .map(|fields| {
                fields
                    .iter()
                    .map(|f| Symbol {
                        name: f.name.clone(),
                        kind: SymbolKind::Field,
                        decl: f.decl,
                        type_id: f.type_id,
                        signature: None,
                        is_constant: false,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn completion_item(&self, ctx: &Context, symbol: &Symbol) -> CompletionItem {
        // Vector components point back at the vector itself.
        let is_vector_component = symbol.kind == SymbolKind::Field
            && !matches!(ctx.declaration(symbol.decl).1.kind, DeclKind::Field { .. });
        let detail = if symbol.kind == SymbolKind::Function {
            let (owner, _) = ctx.declaration(symbol.decl);
            AstPrinter::signature(&owner.ast, symbol.decl.id)
        } else {
            ctx.types().name(symbol.type_id)
        };
        CompletionItem {
            label: symbol.name.clone(),
            kind: symbol.kind,
            detail,
            decl: (!is_vector_component).then_some(symbol.decl),
        }
    }
}
