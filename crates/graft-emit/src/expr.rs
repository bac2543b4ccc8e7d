// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Go rendering of IR expressions.

use std::fmt;

use graft_model::{Program, Scalar, Shape, TypeId};
use graft_plan::{Callee, Expr};

/// Go spelling of the zero value of `ty`.
pub fn zero_literal(program: &Program, ty: TypeId) -> String {
    let types = &program.types;
    match types.shape(ty) {
        Shape::Scalar(Scalar::Bool) => "false".to_string(),
        Shape::Scalar(Scalar::String) => "\"\"".to_string(),
        Shape::Scalar(_) => "0".to_string(),
        Shape::Record | Shape::Array { .. } => format!("{}{{}}", types.display(ty, &program.package)),
        Shape::Sequence(_) | Shape::Map { .. } | Shape::Optional(_) | Shape::Opaque => "nil".to_string(),
    }
}

/// An expression rendered as Go source.
pub struct GoExpr<'a> {
    pub expr: &'a Expr,
    pub program: &'a Program,
}

impl<'a> GoExpr<'a> {
    pub fn new(expr: &'a Expr, program: &'a Program) -> Self {
        Self { expr, program }
    }

    fn nested(&self, expr: &'a Expr) -> Self {
        Self::new(expr, self.program)
    }
}

impl fmt::Display for GoExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Var(name) => f.write_str(name),
            // Go selects fields through pointers implicitly.
            Expr::Field { base, name } => match base.as_ref() {
                Expr::Deref(inner) => write!(f, "{}.{name}", self.nested(inner)),
                other => write!(f, "{}.{name}", self.nested(other)),
            },
            Expr::Deref(inner) => write!(f, "*{}", self.nested(inner)),
            Expr::AddrOf(inner) => write!(f, "&{}", self.nested(inner)),
            Expr::Index { base, index } => write!(f, "{}[{index}]", self.nested(base)),
            Expr::Call { callee, arg, ctx } => {
                let arg = self.nested(arg);
                match (callee, ctx) {
                    (Callee::Method(name), Some(ctx)) => write!(f, "m.{name}({ctx}, {arg})"),
                    (Callee::Method(name), None) => write!(f, "m.{name}({arg})"),
                    (_, Some(ctx)) => write!(f, "{}({ctx}, {arg})", callee.name()),
                    (_, None) => write!(f, "{}({arg})", callee.name()),
                }
            }
            Expr::Zero(ty) => f.write_str(&zero_literal(self.program, *ty)),
            Expr::Nil => f.write_str("nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        graft_model::from_json(
            r#"{
            "package": "p",
            "types": [
                { "name": "User", "fields": [ { "name": "ID", "type": "int" } ] },
                { "name": "Celsius", "underlying": "float64" },
                { "name": "Holder", "fields": [
                    { "name": "Ids", "type": "[]int" }, { "name": "Grid", "type": "[2]int" },
                    { "name": "Ref", "type": "*User" }, { "name": "On", "type": "bool" },
                    { "name": "S", "type": "string" } ] }
            ]
        }"#,
        )
        .unwrap()
    }

    fn field_type(p: &Program, name: &str) -> TypeId {
        let holder = p.types.lookup("Holder").unwrap();
        p.types.field(holder, name).unwrap().ty
    }

    #[test]
    fn zero_literals() {
        let p = program();
        assert_eq!(zero_literal(&p, p.types.lookup("User").unwrap()), "User{}");
        assert_eq!(zero_literal(&p, p.types.lookup("Celsius").unwrap()), "0");
        assert_eq!(zero_literal(&p, field_type(&p, "Ids")), "nil");
        assert_eq!(zero_literal(&p, field_type(&p, "Grid")), "[2]int{}");
        assert_eq!(zero_literal(&p, field_type(&p, "Ref")), "nil");
        assert_eq!(zero_literal(&p, field_type(&p, "On")), "false");
        assert_eq!(zero_literal(&p, field_type(&p, "S")), "\"\"");
    }

    #[test]
    fn fields_through_pointers_drop_the_deref() {
        let p = program();
        let e = Expr::var("p0").deref().field("ID");
        assert_eq!(GoExpr::new(&e, &p).to_string(), "p0.ID");
        let e = Expr::call(Callee::Helper("map_ab".into()), Expr::var("p0").deref(), None);
        assert_eq!(GoExpr::new(&e, &p).to_string(), "map_ab(*p0)");
        let e = Expr::call(Callee::Method("ToDTO".into()), Expr::var("in"), Some("ctx".into()));
        assert_eq!(GoExpr::new(&e, &p).to_string(), "m.ToDTO(ctx, in)");
        assert_eq!(GoExpr::new(&Expr::var("mapped").addr_of(), &p).to_string(), "&mapped");
    }
}
