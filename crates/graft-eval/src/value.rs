// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime values.

use std::fmt;

use graft_model::{Scalar, TypeId, TypeKind, TypeTable};
use indexmap::IndexMap;

/// A runtime value. Nil stands for a nil pointer, slice, map or interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Signed integers of every width.
    Int(i64),
    /// Unsigned integers of every width.
    Uint(u64),
    Float(f64),
    Str(String),
    /// Record fields in declaration order.
    Record(IndexMap<String, Value>),
    Seq(Vec<Value>),
    Array(Vec<Value>),
    Map(IndexMap<MapKey, Value>),
    Ptr(Box<Value>),
}

/// Hashable subset of values usable as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Str(String),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(n) => Some(MapKey::Int(*n)),
            Value::Uint(n) => Some(MapKey::Uint(*n)),
            Value::Str(s) => Some(MapKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(n) => Value::Int(*n),
            MapKey::Uint(n) => Value::Uint(*n),
            MapKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn ptr(inner: Value) -> Self {
        Value::Ptr(Box::new(inner))
    }

    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<MapKey>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Field of a record, looking through one pointer.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(name),
            Value::Ptr(inner) => inner.field(name),
            _ => None,
        }
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::Seq(_) => "slice",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Ptr(_) => "pointer",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Seq(items) | Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "map[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{value}", key.to_value())?;
                }
                write!(f, "]")
            }
            Value::Ptr(inner) => write!(f, "&{inner}"),
        }
    }
}

/// The zero value of `ty`.
pub fn zero_value(types: &TypeTable, ty: TypeId) -> Value {
    match types.kind(types.underlying(ty)) {
        TypeKind::Scalar(scalar) => match scalar {
            Scalar::Bool => Value::Bool(false),
            Scalar::String => Value::Str(String::new()),
            s if s.is_float() => Value::Float(0.0),
            s if s.is_unsigned() => Value::Uint(0),
            _ => Value::Int(0),
        },
        TypeKind::Record(fields) => Value::Record(
            fields
                .iter()
                .map(|f| (f.name.clone(), zero_value(types, f.ty)))
                .collect(),
        ),
        TypeKind::Array { elem, len } => Value::Array(vec![zero_value(types, *elem); *len]),
        TypeKind::Sequence(_)
        | TypeKind::Map { .. }
        | TypeKind::Optional(_)
        | TypeKind::Interface
        | TypeKind::Named { .. } => Value::Nil,
    }
}

/// Convert a scalar to the representation of `scalar`, truncating integers
/// to the target width.
pub fn convert_scalar(value: &Value, scalar: Scalar) -> Option<Value> {
    let bits = scalar.bits().unwrap_or(64);
    let converted = match (value, scalar) {
        (Value::Bool(b), Scalar::Bool) => Value::Bool(*b),
        (Value::Str(s), Scalar::String) => Value::Str(s.clone()),
        (v, s) if s.is_float() => {
            let x = match v {
                Value::Int(n) => *n as f64,
                Value::Uint(n) => *n as f64,
                Value::Float(x) => *x,
                _ => return None,
            };
            if bits == 32 {
                Value::Float(x as f32 as f64)
            } else {
                Value::Float(x)
            }
        }
        (v, s) if s.is_unsigned() => {
            let n = match v {
                Value::Int(n) => *n as u64,
                Value::Uint(n) => *n,
                Value::Float(x) => *x as u64,
                _ => return None,
            };
            Value::Uint(if bits < 64 { n & ((1u64 << bits) - 1) } else { n })
        }
        (v, s) if s.is_signed() => {
            let n = match v {
                Value::Int(n) => *n,
                Value::Uint(n) => *n as i64,
                Value::Float(x) => *x as i64,
                _ => return None,
            };
            let shift = 64 - bits;
            Value::Int((n << shift) >> shift)
        }
        _ => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::{Field, TypeTable};

    #[test]
    fn zero_values_follow_go() {
        let mut types = TypeTable::new();
        let int = types.scalar(Scalar::Int);
        let string = types.scalar(Scalar::String);
        let seq = types.sequence(int);
        let arr = types.array(string, 2);
        let rec = types.record(vec![Field::new("A", int), Field::new("B", seq)]);
        let ptr = types.optional(rec);

        assert_eq!(zero_value(&types, int), Value::Int(0));
        assert_eq!(zero_value(&types, seq), Value::Nil);
        assert_eq!(zero_value(&types, ptr), Value::Nil);
        assert_eq!(
            zero_value(&types, arr),
            Value::Array(vec![Value::str(""), Value::str("")])
        );
        assert_eq!(
            zero_value(&types, rec),
            Value::record([("A", Value::Int(0)), ("B", Value::Nil)])
        );
    }

    #[test]
    fn integer_conversions_truncate() {
        assert_eq!(convert_scalar(&Value::Int(300), Scalar::Uint8), Some(Value::Uint(44)));
        assert_eq!(convert_scalar(&Value::Int(-1), Scalar::Int8), Some(Value::Int(-1)));
        assert_eq!(convert_scalar(&Value::Int(200), Scalar::Int8), Some(Value::Int(-56)));
        assert_eq!(convert_scalar(&Value::Int(7), Scalar::Float64), Some(Value::Float(7.0)));
        assert_eq!(convert_scalar(&Value::Float(2.9), Scalar::Int64), Some(Value::Int(2)));
        assert_eq!(convert_scalar(&Value::str("x"), Scalar::Int), None);
    }

    #[test]
    fn display_is_compact() {
        let v = Value::record([
            ("Name", Value::str("a")),
            ("Tags", Value::Seq(vec![Value::Int(1), Value::Int(2)])),
            ("Next", Value::Nil),
        ]);
        assert_eq!(v.to_string(), r#"{Name: "a", Tags: [1 2], Next: nil}"#);
    }
}
