//! Runtime type table shared by every script in a context.

use hashbrown::HashMap;

use crate::ast::DeclRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const INVALID: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const FLOAT: TypeId = TypeId(3);
    pub const STRING: TypeId = TypeId(4);
    pub const OBJECT: TypeId = TypeId(5);
    pub const VECTOR: TypeId = TypeId(6);
    pub const ACTION: TypeId = TypeId(7);

    pub fn is_numeric(self) -> bool {
        self == TypeId::INT || self == TypeId::FLOAT
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub type_id: TypeId,
    pub decl: DeclRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub name: String,
    pub payload: Vec<TypeId>,
    pub decl: DeclRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Builtin,
    /// `ENGINE_STRUCTURE_<n>` from the command script
    Engine(u32),
    Struct {
        decl: DeclRef,
        fields: Vec<FieldInfo>,
    },
    Newtype {
        decl: DeclRef,
        inner: TypeId,
    },
    Opaque {
        decl: DeclRef,
    },
    Sum {
        decl: DeclRef,
        variants: Vec<VariantInfo>,
    },
    Tuple(Vec<TypeId>),
    Function {
        params: Vec<TypeId>,
        ret: TypeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
}

/// Interned structural types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
    Tuple(Vec<TypeId>),
    Function(Vec<TypeId>, TypeId),
}

#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    /// Built-in and engine type names
    by_name: HashMap<String, TypeId>,
    shapes: HashMap<Shape, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            shapes: HashMap::new(),
        };
        for name in ["<invalid>", "void", "int", "float", "string", "object", "vector", "action"] {
            let id = TypeId(table.types.len() as u32);
            table.types.push(TypeInfo {
                name: name.to_string(),
                kind: TypeKind::Builtin,
            });
            if id != TypeId::INVALID {
                table.by_name.insert(name.to_string(), id);
            }
        }
        table
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Looks up a built-in or engine type by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn push(&mut self, name: String, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo { name, kind });
        id
    }

    /// Registers an engine structure. Re-registering a name returns the
    /// existing id.
    pub fn add_engine(&mut self, index: u32, name: &str) -> TypeId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let id = self.push(name.to_string(), TypeKind::Engine(index));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Adds a user-declared type. Named user types are scoped by the
    /// resolver, not by this table.
    pub fn add_user(&mut self, name: &str, kind: TypeKind) -> TypeId {
        self.push(name.to_string(), kind)
    }

    /// Replaces the kind of a type added earlier, so recursive references
    /// can name it before its fields are known.
    pub fn set_kind(&mut self, id: TypeId, kind: TypeKind) {
        if let Some(info) = self.types.get_mut(id.index()) {
            info.kind = kind;
        }
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        let shape = Shape::Tuple(elems.clone());
        if let Some(&id) = self.shapes.get(&shape) {
            return id;
        }
        let name = format!("({})", self.join(&elems));
        let id = self.push(name, TypeKind::Tuple(elems));
        self.shapes.insert(shape, id);
        id
    }

    pub fn function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        let shape = Shape::Function(params.clone(), ret);
        if let Some(&id) = self.shapes.get(&shape) {
            return id;
        }
        let name = format!("fn({}): {}", self.join(&params), self.name(ret));
        let id = self.push(name, TypeKind::Function { params, ret });
        self.shapes.insert(shape, id);
        id
    }

    fn join(&self, ids: &[TypeId]) -> String {
        ids.iter().map(|&t| self.name(t)).collect::<Vec<_>>().join(", ")
    }

    /// Printable name of a type.
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(TypeInfo {
                name,
                kind: TypeKind::Struct { .. },
            }) => format!("struct {name}"),
            Some(info) => info.name.clone(),
            None => "<invalid>".to_string(),
        }
    }

    pub fn kind(&self, id: TypeId) -> Option<&TypeKind> {
        self.get(id).map(|info| &info.kind)
    }

    pub fn struct_fields(&self, id: TypeId) -> Option<&[FieldInfo]> {
        match self.kind(id)? {
            TypeKind::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn variants(&self, id: TypeId) -> Option<&[VariantInfo]> {
        match self.kind(id)? {
            TypeKind::Sum { variants, .. } => Some(variants),
            _ => None,
        }
    }

    /// True if a value of type `from` may be used where `to` is expected.
    ///
    /// Invalid types convert both ways so one error doesn't cascade.
    pub fn is_convertible(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || from == TypeId::INVALID || to == TypeId::INVALID {
            return true;
        }
        if from == TypeId::INT && to == TypeId::FLOAT {
            return true;
        }
        if to == TypeId::ACTION {
            return matches!(self.kind(from), Some(TypeKind::Function { params, .. }) if params.is_empty());
        }
        false
    }
}
