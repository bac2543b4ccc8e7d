// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type representation for the mapping model.

use std::fmt;

/// Handle into a [`TypeTable`](crate::TypeTable).
///
/// Structural types are interned, so two handles are equal exactly when the
/// types are identical. Named types are nominal: each declaration gets its
/// own handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Builtin scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl Scalar {
    pub const ALL: [Scalar; 14] = [
        Scalar::Bool,
        Scalar::Int,
        Scalar::Int8,
        Scalar::Int16,
        Scalar::Int32,
        Scalar::Int64,
        Scalar::Uint,
        Scalar::Uint8,
        Scalar::Uint16,
        Scalar::Uint32,
        Scalar::Uint64,
        Scalar::Float32,
        Scalar::Float64,
        Scalar::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::Int => "int",
            Scalar::Int8 => "int8",
            Scalar::Int16 => "int16",
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::Uint => "uint",
            Scalar::Uint8 => "uint8",
            Scalar::Uint16 => "uint16",
            Scalar::Uint32 => "uint32",
            Scalar::Uint64 => "uint64",
            Scalar::Float32 => "float32",
            Scalar::Float64 => "float64",
            Scalar::String => "string",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Scalar::Int | Scalar::Int8 | Scalar::Int16 | Scalar::Int32 | Scalar::Int64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Scalar::Uint | Scalar::Uint8 | Scalar::Uint16 | Scalar::Uint32 | Scalar::Uint64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Scalar::Float32 | Scalar::Float64)
    }

    /// Bit width of numeric kinds. `int` and `uint` are treated as 64 bits.
    pub fn bits(self) -> Option<u32> {
        match self {
            Scalar::Int8 | Scalar::Uint8 => Some(8),
            Scalar::Int16 | Scalar::Uint16 => Some(16),
            Scalar::Int32 | Scalar::Uint32 | Scalar::Float32 => Some(32),
            Scalar::Int | Scalar::Int64 | Scalar::Uint | Scalar::Uint64 | Scalar::Float64 => {
                Some(64)
            }
            Scalar::Bool | Scalar::String => None,
        }
    }

    /// Whether every value of `self` is representable in `to` without loss.
    pub fn widens_to(self, to: Scalar) -> bool {
        let (Some(from_bits), Some(to_bits)) = (self.bits(), to.bits()) else {
            return false;
        };
        if self.is_float() || to.is_float() {
            return self.is_float() && to.is_float() && from_bits < to_bits;
        }
        // Signed values never fit an unsigned target.
        if self.is_signed() && to.is_unsigned() {
            return false;
        }
        from_bits < to_bits
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    /// Raw struct tag, e.g. `map:"label" json:"x"`.
    pub tag: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Exported fields start with an uppercase letter.
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Type structure stored in the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar(Scalar),
    /// Declared type. `underlying` is filled in after declaration so that
    /// declarations may refer to each other.
    Named {
        name: String,
        package: Option<String>,
        underlying: Option<TypeId>,
    },
    Record(Vec<Field>),
    Sequence(TypeId),
    Array { elem: TypeId, len: usize },
    Map { key: TypeId, value: TypeId },
    /// Pointer; may be nil.
    Optional(TypeId),
    /// Behavior-only type such as `error` or `context.Context`.
    Interface,
}

/// Shape of a type after looking through declarations.
///
/// Pointers are kept as [`Shape::Optional`] rather than looked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar(Scalar),
    Record,
    Sequence(TypeId),
    Array { elem: TypeId, len: usize },
    Map { key: TypeId, value: TypeId },
    Optional(TypeId),
    Opaque,
}

impl Shape {
    pub fn is_collection(&self) -> bool {
        matches!(self, Shape::Sequence(_) | Shape::Array { .. } | Shape::Map { .. })
    }
}
