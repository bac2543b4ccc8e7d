// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type expression parser.
//!
//! Accepts the Go type syntax used in model files: `*T`, `[]T`, `[N]T`,
//! `map[K]V`, `pkg.Name`, `Name` and builtin names.

use crate::error::ModelError;
use crate::table::TypeTable;
use crate::types::TypeId;

/// Parse a type expression, resolving names against `types`.
///
/// `context` names the declaration being read and shows up in errors.
pub fn parse_type_expr(s: &str, types: &mut TypeTable, context: &str) -> Result<TypeId, ModelError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(invalid(s, "empty type"));
    }

    if let Some(rest) = s.strip_prefix('*') {
        let inner = parse_type_expr(rest, types, context)?;
        return Ok(types.optional(inner));
    }

    if let Some(rest) = s.strip_prefix("[]") {
        let elem = parse_type_expr(rest, types, context)?;
        return Ok(types.sequence(elem));
    }

    if let Some(rest) = s.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| invalid(s, "unclosed array length"))?;
        let len: usize = rest[..close]
            .trim()
            .parse()
            .map_err(|_| invalid(s, "array length must be an integer"))?;
        let elem = parse_type_expr(&rest[close + 1..], types, context)?;
        return Ok(types.array(elem, len));
    }

    if let Some(rest) = s.strip_prefix("map[") {
        let close = matching_bracket(rest).ok_or_else(|| invalid(s, "unclosed map key"))?;
        let key = parse_type_expr(&rest[..close], types, context)?;
        let value = parse_type_expr(&rest[close + 1..], types, context)?;
        return Ok(types.map(key, value));
    }

    if s == "interface{}" || s == "any" {
        return Ok(types.interface());
    }

    if !s
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
    {
        return Err(invalid(s, "unexpected character"));
    }

    types.lookup(s).ok_or_else(|| ModelError::UnknownType {
        name: s.to_string(),
        context: context.to_string(),
    })
}

/// Index of the `]` closing a bracket opened just before `s`.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn invalid(expr: &str, reason: &str) -> ModelError {
    ModelError::InvalidTypeExpr {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scalar, Shape, TypeKind};

    fn parse(s: &str, types: &mut TypeTable) -> TypeId {
        parse_type_expr(s, types, "test").unwrap()
    }

    #[test]
    fn parses_composite_types() {
        let mut types = TypeTable::new();
        let int = types.scalar(Scalar::Int);
        let string = types.scalar(Scalar::String);

        let seq = parse("[]int", &mut types);
        assert_eq!(types.shape(seq), Shape::Sequence(int));

        let arr = parse("[3]string", &mut types);
        assert_eq!(types.shape(arr), Shape::Array { elem: string, len: 3 });

        let ptr = parse("*[]int", &mut types);
        assert_eq!(types.shape(ptr), Shape::Optional(seq));
    }

    #[test]
    fn parses_nested_map_keys() {
        let mut types = TypeTable::new();
        let id = parse("map[[2]int][]string", &mut types);
        let TypeKind::Map { key, value } = types.kind(id).clone() else {
            panic!("expected map");
        };
        assert!(matches!(types.shape(key), Shape::Array { len: 2, .. }));
        assert!(matches!(types.shape(value), Shape::Sequence(_)));
    }

    #[test]
    fn resolves_declared_and_qualified_names() {
        let mut types = TypeTable::new();
        let user = types.declare_named("User", None).unwrap();
        let time = types.declare_named("Time", Some("time")).unwrap();
        assert_eq!(parse("User", &mut types), user);
        assert_eq!(parse("time.Time", &mut types), time);
        let ctx = parse("context.Context", &mut types);
        assert!(types.is_context(ctx));
    }

    #[test]
    fn reports_unknown_names_with_context() {
        let mut types = TypeTable::new();
        let err = parse_type_expr("[]Missing", &mut types, "field User.Tags").unwrap_err();
        assert_eq!(err.to_string(), "unknown type 'Missing' in field User.Tags");
    }

    #[test]
    fn rejects_malformed_expressions() {
        let mut types = TypeTable::new();
        assert!(matches!(
            parse_type_expr("[x]int", &mut types, "t"),
            Err(ModelError::InvalidTypeExpr { .. })
        ));
        assert!(matches!(
            parse_type_expr("map[string", &mut types, "t"),
            Err(ModelError::InvalidTypeExpr { .. })
        ));
        assert!(matches!(
            parse_type_expr("func()", &mut types, "t"),
            Err(ModelError::InvalidTypeExpr { .. })
        ));
    }
}
