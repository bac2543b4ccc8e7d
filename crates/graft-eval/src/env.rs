// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Call frames and assignable places.

use std::collections::HashMap;

use graft_plan::{Expr, InterfacePlan};

use crate::error::EvalError;
use crate::value::{MapKey, Value};

/// Locals of one helper or method invocation.
#[derive(Debug)]
pub(crate) struct Frame<'p> {
    locals: HashMap<String, Value>,
    /// Returned together with a failure raised in this frame.
    pub failure_value: &'p Expr,
    /// Interface whose methods `CallInterfaceMethod` nodes refer to.
    pub interface: Option<&'p InterfacePlan>,
}

/// One step from a local variable to the place being assigned.
enum Step {
    Field(String),
    Deref,
    Index(Value),
}

impl<'p> Frame<'p> {
    pub fn new(failure_value: &'p Expr, interface: Option<&'p InterfacePlan>) -> Self {
        Self {
            locals: HashMap::new(),
            failure_value,
            interface,
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<&Value, EvalError> {
        self.locals
            .get(name)
            .ok_or_else(|| EvalError::Unbound(name.to_string()))
    }

    /// Store `value` at `target`. Assigning to a plain variable defines it.
    pub fn assign(&mut self, target: &Expr, value: Value) -> Result<(), EvalError> {
        let mut steps = Vec::new();
        let root = self.place_path(target, &mut steps)?.to_string();
        if steps.is_empty() {
            self.locals.insert(root, value);
            return Ok(());
        }
        let mut slot = self
            .locals
            .get_mut(&root)
            .ok_or(EvalError::Unbound(root.clone()))?;
        for step in steps {
            slot = step_mut(slot, step)?;
        }
        *slot = value;
        Ok(())
    }

    /// Root variable of `target`, pushing the steps below it.
    fn place_path<'e>(&self, target: &'e Expr, steps: &mut Vec<Step>) -> Result<&'e str, EvalError> {
        match target {
            Expr::Var(name) => Ok(name.as_str()),
            Expr::Field { base, name } => {
                let root = self.place_path(base, steps)?;
                steps.push(Step::Field(name.clone()));
                Ok(root)
            }
            Expr::Deref(inner) => {
                let root = self.place_path(inner, steps)?;
                steps.push(Step::Deref);
                Ok(root)
            }
            Expr::Index { base, index } => {
                let root = self.place_path(base, steps)?;
                steps.push(Step::Index(self.get(index)?.clone()));
                Ok(root)
            }
            Expr::AddrOf(_) | Expr::Call { .. } | Expr::Zero(_) | Expr::Nil => Err(EvalError::Shape {
                expected: "assignable place",
                found: "expression",
            }),
        }
    }
}

fn step_mut(slot: &mut Value, step: Step) -> Result<&mut Value, EvalError> {
    match step {
        Step::Field(name) => field_mut(slot, &name),
        Step::Deref => match slot {
            Value::Ptr(inner) => Ok(inner),
            Value::Nil => Err(EvalError::NilDereference),
            other => Err(EvalError::Shape {
                expected: "pointer",
                found: other.type_name(),
            }),
        },
        Step::Index(key) => index_mut(slot, &key),
    }
}

fn field_mut<'v>(slot: &'v mut Value, name: &str) -> Result<&'v mut Value, EvalError> {
    match slot {
        Value::Ptr(inner) => field_mut(inner, name),
        Value::Record(fields) => fields.get_mut(name).ok_or_else(|| EvalError::NoSuchField {
            field: name.to_string(),
            found: "record".to_string(),
        }),
        Value::Nil => Err(EvalError::NilDereference),
        other => Err(EvalError::NoSuchField {
            field: name.to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn index_mut<'v>(slot: &'v mut Value, key: &Value) -> Result<&'v mut Value, EvalError> {
    match slot {
        Value::Seq(items) | Value::Array(items) => {
            let index = position(key)?;
            let len = items.len();
            items
                .get_mut(index)
                .ok_or(EvalError::IndexOutOfRange { index, len })
        }
        Value::Map(entries) => {
            let key = MapKey::from_value(key).ok_or(EvalError::Shape {
                expected: "map key",
                found: key.type_name(),
            })?;
            Ok(entries.entry(key).or_insert(Value::Nil))
        }
        Value::Nil => Err(EvalError::NilDereference),
        other => Err(EvalError::Shape {
            expected: "collection",
            found: other.type_name(),
        }),
    }
}

/// Integer value used as a sequence index.
pub(crate) fn position(key: &Value) -> Result<usize, EvalError> {
    match key {
        Value::Int(n) if *n >= 0 => Ok(*n as usize),
        Value::Uint(n) => Ok(*n as usize),
        other => Err(EvalError::Shape {
            expected: "index",
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame<'static> {
        static NIL: Expr = Expr::Nil;
        Frame::new(&NIL, None)
    }

    #[test]
    fn assigns_through_fields_and_pointers() {
        let mut f = frame();
        f.define(
            "dst",
            Value::ptr(Value::record([("Inner", Value::record([("X", Value::Int(0))]))])),
        );
        let target = Expr::var("dst").deref().field("Inner").field("X");
        f.assign(&target, Value::Int(5)).unwrap();
        assert_eq!(f.get("dst").unwrap().field("Inner").unwrap().field("X"), Some(&Value::Int(5)));
    }

    #[test]
    fn assigns_by_index_and_key() {
        let mut f = frame();
        f.define("xs", Value::Seq(vec![Value::Int(0); 2]));
        f.define("m", Value::map(Vec::<(&str, Value)>::new()));
        f.define("i", Value::Int(1));
        f.define("k", Value::str("a"));

        f.assign(&Expr::Index { base: Box::new(Expr::var("xs")), index: "i".into() }, Value::Int(9))
            .unwrap();
        f.assign(&Expr::Index { base: Box::new(Expr::var("m")), index: "k".into() }, Value::Int(3))
            .unwrap();
        assert_eq!(f.get("xs").unwrap(), &Value::Seq(vec![Value::Int(0), Value::Int(9)]));
        assert_eq!(f.get("m").unwrap(), &Value::map([("a", Value::Int(3))]));

        f.define("i", Value::Int(4));
        let err = f
            .assign(&Expr::Index { base: Box::new(Expr::var("xs")), index: "i".into() }, Value::Nil)
            .unwrap_err();
        assert_eq!(err, EvalError::IndexOutOfRange { index: 4, len: 2 });
    }

    #[test]
    fn nil_targets_are_errors() {
        let mut f = frame();
        f.define("p", Value::Nil);
        let err = f.assign(&Expr::var("p").field("X"), Value::Int(1)).unwrap_err();
        assert_eq!(err, EvalError::NilDereference);
        let err = f.assign(&Expr::var("q").field("X"), Value::Nil).unwrap_err();
        assert_eq!(err, EvalError::Unbound("q".into()));
    }

    #[test]
    fn assigning_a_variable_defines_it() {
        let mut f = frame();
        f.assign(&Expr::var("mapped"), Value::Int(1)).unwrap();
        assert_eq!(f.get("mapped").unwrap(), &Value::Int(1));
    }
}
