//! Symbols and persistent environments.
//!
//! An [`Env`] is an immutable list of bindings in front of a shared export
//! table. Extending an environment never changes earlier snapshots, so every
//! node can keep the environment it was resolved in.

use std::fmt;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::ast::DeclRef;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
    Param,
    Field,
    Variant,
    Module,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Type => "type",
            SymbolKind::Param => "param",
            SymbolKind::Field => "field",
            SymbolKind::Variant => "variant",
            SymbolKind::Module => "module",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub type_id: TypeId,
    pub is_const: bool,
    /// Printed default value
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: SmallVec<[ParamInfo; 4]>,
    pub ret: TypeId,
}

impl Signature {
    /// Number of parameters without a default.
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub decl: DeclRef,
    pub type_id: TypeId,
    pub signature: Option<Rc<Signature>>,
    /// Constants and defines
    pub is_constant: bool,
}

/// Symbols a script makes visible to its dependents.
pub type Exports = HashMap<String, Symbol>;

struct Binding {
    symbol: Symbol,
    next: Option<Rc<Binding>>,
}

#[derive(Clone, Default)]
pub struct Env {
    head: Option<Rc<Binding>>,
    outer: Option<Rc<Exports>>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("bindings", &self.bindings().count())
            .field("outer", &self.outer.as_ref().map_or(0, |o| o.len()))
            .finish()
    }
}

impl Env {
    pub fn with_outer(outer: Rc<Exports>) -> Self {
        Self {
            head: None,
            outer: Some(outer),
        }
    }

    pub fn outer(&self) -> Option<&Exports> {
        self.outer.as_deref()
    }

    /// Returns a new environment with `symbol` in front.
    pub fn bind(&self, symbol: Symbol) -> Env {
        Env {
            head: Some(Rc::new(Binding {
                symbol,
                next: self.head.clone(),
            })),
            outer: self.outer.clone(),
        }
    }

    pub fn push(&mut self, symbol: Symbol) {
        *self = self.bind(symbol);
    }

    fn bindings(&self) -> impl Iterator<Item = &Symbol> {
        std::iter::successors(self.head.as_deref(), |b| b.next.as_deref()).map(|b| &b.symbol)
    }

    /// Innermost symbol named `name`.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.bindings()
            .find(|s| s.name == name)
            .or_else(|| self.outer.as_ref().and_then(|o| o.get(name)))
    }

    /// Every visible symbol, skipping shadowed ones.
    pub fn iter(&self) -> Vec<&Symbol> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for symbol in self.bindings() {
            if seen.insert(symbol.name.as_str()) {
                out.push(symbol);
            }
        }
        if let Some(outer) = &self.outer {
            for symbol in outer.values() {
                if seen.insert(symbol.name.as_str()) {
                    out.push(symbol);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeclId, ScriptId};

    fn symbol(name: &str, id: u32, type_id: TypeId) -> Symbol {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Variable,
            decl: DeclRef {
                script: ScriptId(0),
                id: DeclId(id),
            },
            type_id,
            signature: None,
            is_constant: false,
        }
    }

    #[test]
    fn test_snapshots_are_persistent() {
        let base = Env::default().bind(symbol("x", 0, TypeId::INT));
        let inner = base.bind(symbol("x", 1, TypeId::FLOAT));
        assert_eq!(base.lookup("x").map(|s| s.type_id), Some(TypeId::INT));
        assert_eq!(inner.lookup("x").map(|s| s.type_id), Some(TypeId::FLOAT));
        assert_eq!(inner.iter().len(), 1);
    }

    #[test]
    fn test_outer_exports() {
        let mut exports = Exports::new();
        exports.insert("GetTag".into(), symbol("GetTag", 7, TypeId::STRING));
        exports.insert("x".into(), symbol("x", 8, TypeId::OBJECT));
        let env = Env::with_outer(Rc::new(exports)).bind(symbol("x", 0, TypeId::INT));
        assert_eq!(env.lookup("GetTag").map(|s| s.decl.id), Some(DeclId(7)));
        assert_eq!(env.lookup("x").map(|s| s.type_id), Some(TypeId::INT));
        assert_eq!(env.iter().len(), 2);
    }
}
