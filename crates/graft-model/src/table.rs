// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Central type registry.

use std::collections::HashMap;
use std::fmt;

use crate::error::ModelError;
use crate::types::{Field, Scalar, Shape, TypeId, TypeKind};

/// Interning arena for every type in a program.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeKind>,
    /// Structural kinds mapped to their handle. Named types are never interned.
    interned: HashMap<TypeKind, TypeId>,
    /// Declared names (`Name` or `pkg.Name`) mapped to handles.
    names: HashMap<String, TypeId>,
    error_type: TypeId,
    context_type: TypeId,
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
            interned: HashMap::new(),
            names: HashMap::new(),
            error_type: TypeId(0),
            context_type: TypeId(0),
        };
        table.register_builtins();
        table
    }

    fn register_builtins(&mut self) {
        for scalar in Scalar::ALL {
            let id = self.scalar(scalar);
            self.names.insert(scalar.name().to_string(), id);
        }
        let byte = self.scalar(Scalar::Uint8);
        self.names.insert("byte".to_string(), byte);
        let rune = self.scalar(Scalar::Int32);
        self.names.insert("rune".to_string(), rune);

        let opaque = self.intern(TypeKind::Interface);
        self.error_type = self.push_named("error", None, Some(opaque));
        self.context_type = self.push_named("Context", Some("context"), Some(opaque));
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    fn push_named(
        &mut self,
        name: &str,
        package: Option<&str>,
        underlying: Option<TypeId>,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeKind::Named {
            name: name.to_string(),
            package: package.map(str::to_string),
            underlying,
        });
        self.names.insert(qualified(name, package), id);
        id
    }

    // --- Constructors ---

    pub fn scalar(&mut self, scalar: Scalar) -> TypeId {
        self.intern(TypeKind::Scalar(scalar))
    }

    pub fn sequence(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Sequence(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: usize) -> TypeId {
        self.intern(TypeKind::Array { elem, len })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeKind::Map { key, value })
    }

    pub fn optional(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeKind::Optional(inner))
    }

    pub fn record(&mut self, fields: Vec<Field>) -> TypeId {
        self.intern(TypeKind::Record(fields))
    }

    pub fn interface(&mut self) -> TypeId {
        self.intern(TypeKind::Interface)
    }

    /// Declare a named type without a definition yet.
    pub fn declare_named(&mut self, name: &str, package: Option<&str>) -> Result<TypeId, ModelError> {
        let key = qualified(name, package);
        if self.names.contains_key(&key) {
            return Err(ModelError::Duplicate(key));
        }
        Ok(self.push_named(name, package, None))
    }

    /// Attach the underlying type of a previously declared named type.
    pub fn define_named(&mut self, id: TypeId, definition: TypeId) -> Result<(), ModelError> {
        let display = self.display(id, "").to_string();
        match &mut self.types[id.0 as usize] {
            TypeKind::Named { underlying, .. } => {
                *underlying = Some(definition);
            }
            _ => return Err(ModelError::NotNamed(display)),
        }
        if self.underlying_checked(id).is_none() {
            if let TypeKind::Named { underlying, .. } = &mut self.types[id.0 as usize] {
                *underlying = None;
            }
            return Err(ModelError::CyclicDefinition(display));
        }
        Ok(())
    }

    // --- Queries ---

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    /// Look up a declared or builtin name (`User`, `time.Time`, `int`).
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    pub fn error_type(&self) -> TypeId {
        self.error_type
    }

    pub fn context_type(&self) -> TypeId {
        self.context_type
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == self.error_type
    }

    pub fn is_context(&self, id: TypeId) -> bool {
        id == self.context_type
    }

    pub fn is_named(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Named { .. })
    }

    pub fn name_of(&self, id: TypeId) -> Option<&str> {
        match self.kind(id) {
            TypeKind::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Follow named declarations down to a structural type.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        self.underlying_checked(id).unwrap_or(id)
    }

    fn underlying_checked(&self, mut id: TypeId) -> Option<TypeId> {
        for _ in 0..=self.types.len() {
            match self.kind(id) {
                TypeKind::Named {
                    underlying: Some(next),
                    ..
                } => id = *next,
                _ => return Some(id),
            }
        }
        None
    }

    pub fn shape(&self, id: TypeId) -> Shape {
        match self.kind(self.underlying(id)) {
            TypeKind::Scalar(s) => Shape::Scalar(*s),
            TypeKind::Record(_) => Shape::Record,
            TypeKind::Sequence(elem) => Shape::Sequence(*elem),
            TypeKind::Array { elem, len } => Shape::Array {
                elem: *elem,
                len: *len,
            },
            TypeKind::Map { key, value } => Shape::Map {
                key: *key,
                value: *value,
            },
            TypeKind::Optional(inner) => Shape::Optional(*inner),
            TypeKind::Interface | TypeKind::Named { .. } => Shape::Opaque,
        }
    }

    pub fn is_record_like(&self, id: TypeId) -> bool {
        self.shape(id) == Shape::Record
    }

    /// Payload of a pointer to a record, if `id` is one.
    pub fn optional_record(&self, id: TypeId) -> Option<TypeId> {
        match self.shape(id) {
            Shape::Optional(inner) if self.is_record_like(inner) => Some(inner),
            _ => None,
        }
    }

    /// Fields of a record-like type in declaration order; empty otherwise.
    pub fn fields(&self, id: TypeId) -> &[Field] {
        match self.kind(self.underlying(id)) {
            TypeKind::Record(fields) => fields,
            _ => &[],
        }
    }

    pub fn field(&self, id: TypeId, name: &str) -> Option<&Field> {
        self.fields(id).iter().find(|f| f.name == name)
    }

    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    /// Whether a value of `src` converts to `dst` with a plain conversion.
    ///
    /// Scalars convert when their kinds match or widen losslessly. Other
    /// types convert when their underlying types are identical and at least
    /// one side is unnamed, so two distinct declared records never do.
    pub fn assignable(&self, src: TypeId, dst: TypeId) -> bool {
        if src == dst {
            return true;
        }
        let (us, ud) = (self.underlying(src), self.underlying(dst));
        match (self.kind(us), self.kind(ud)) {
            (TypeKind::Scalar(a), TypeKind::Scalar(b)) => a == b || a.widens_to(*b),
            _ => us == ud && (!self.is_named(src) || !self.is_named(dst)),
        }
    }

    /// Render a type in Go syntax, qualifying names outside `local_package`.
    pub fn display<'a>(&'a self, id: TypeId, local_package: &'a str) -> TypeDisplay<'a> {
        TypeDisplay {
            table: self,
            id,
            local_package,
        }
    }
}

fn qualified(name: &str, package: Option<&str>) -> String {
    match package {
        Some(pkg) => format!("{pkg}.{name}"),
        None => name.to_string(),
    }
}

/// Go-syntax rendering of a type; see [`TypeTable::display`].
pub struct TypeDisplay<'a> {
    table: &'a TypeTable,
    id: TypeId,
    local_package: &'a str,
}

impl TypeDisplay<'_> {
    fn nested(&self, id: TypeId) -> Self {
        TypeDisplay {
            table: self.table,
            id,
            local_package: self.local_package,
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table.kind(self.id) {
            TypeKind::Scalar(s) => write!(f, "{s}"),
            TypeKind::Named { name, package, .. } => match package {
                Some(pkg) if pkg != self.local_package => write!(f, "{pkg}.{name}"),
                _ => write!(f, "{name}"),
            },
            TypeKind::Record(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, " {} {}", field.name, self.nested(field.ty))?;
                    if let Some(tag) = &field.tag {
                        write!(f, " `{tag}`")?;
                    }
                }
                if !fields.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
            TypeKind::Sequence(elem) => write!(f, "[]{}", self.nested(*elem)),
            TypeKind::Array { elem, len } => write!(f, "[{len}]{}", self.nested(*elem)),
            TypeKind::Map { key, value } => {
                write!(f, "map[{}]{}", self.nested(*key), self.nested(*value))
            }
            TypeKind::Optional(inner) => write!(f, "*{}", self.nested(*inner)),
            TypeKind::Interface => write!(f, "interface{{}}"),
        }
    }
}
