// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Plan interpreter.
//!
//! Executes planned method and helper bodies the way the generated code
//! would run them, including nil guards, partially filled results and
//! failures returned from custom functions.

use std::collections::HashMap;

use graft_model::{Program, TypeKind};
use graft_plan::{Callee, Expr, GenerationPlan, HelperPlan, InterfacePlan, LoopVars, MethodPlan, Node};

use crate::env::{position, Frame};
use crate::error::EvalError;
use crate::value::{convert_scalar, zero_value, MapKey, Value};

/// Host implementation of a custom function. `Err` is a failure of the
/// mapped code, reported through [`Outcome::failure`].
pub type CustomFn = Box<dyn Fn(&Value) -> Result<Value, String>>;

/// Custom function implementations by name.
#[derive(Default)]
pub struct Functions {
    funcs: HashMap<String, CustomFn>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> Result<Value, String> + 'static,
    ) -> &mut Self {
        self.funcs.insert(name.into(), Box::new(f));
        self
    }

    fn get(&self, name: &str) -> Option<&CustomFn> {
        self.funcs.get(name)
    }
}

/// Result of one call: the returned value and the failure returned next
/// to it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub failure: Option<String>,
}

impl Outcome {
    fn ok(value: Value) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// How a body stopped.
enum Flow {
    Next,
    Exit(Outcome),
}

pub struct Interpreter<'p> {
    plan: &'p GenerationPlan,
    program: &'p Program,
    functions: Functions,
    helpers: HashMap<&'p str, &'p HelperPlan>,
}

impl<'p> Interpreter<'p> {
    pub fn new(plan: &'p GenerationPlan, program: &'p Program, functions: Functions) -> Self {
        let helpers = plan.helpers.iter().map(|h| (h.name.as_str(), h)).collect();
        Self {
            plan,
            program,
            functions,
            helpers,
        }
    }

    /// Invoke `interface.method` with one argument per declared parameter,
    /// context parameters included.
    pub fn call_method(&self, interface: &str, method: &str, args: Vec<Value>) -> Result<Outcome, EvalError> {
        let unknown = || EvalError::UnknownMethod {
            interface: interface.to_string(),
            method: method.to_string(),
        };
        let iface = self.plan.interface(interface).ok_or_else(unknown)?;
        let plan = iface.method(method).ok_or_else(unknown)?;
        self.run_method(iface, plan, args)
    }

    /// Invoke a helper directly. `ctx` is ignored unless the helper takes a
    /// context.
    pub fn call_helper(&self, name: &str, ctx: Option<Value>, arg: Value) -> Result<Outcome, EvalError> {
        let helper = self
            .helpers
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UnknownHelper(name.to_string()))?;
        let mut frame = Frame::new(&helper.failure_value, None);
        if helper.has_context {
            frame.define("ctx", ctx.unwrap_or(Value::Nil));
        }
        frame.define("in", arg);
        log::trace!("enter helper {name}");
        self.run_body(&helper.body, &mut frame)
    }

    fn run_method(&self, iface: &'p InterfacePlan, method: &'p MethodPlan, args: Vec<Value>) -> Result<Outcome, EvalError> {
        if args.len() != method.params.len() {
            return Err(EvalError::Arity {
                callee: format!("{}.{}", iface.name, method.name),
                expected: method.params.len(),
                got: args.len(),
            });
        }
        let mut frame = Frame::new(&method.failure_value, Some(iface));
        for (param, arg) in method.params.iter().zip(args) {
            frame.define(param.name.as_str(), arg);
        }
        log::trace!("enter {}.{}", iface.name, method.name);
        self.run_body(&method.body, &mut frame)
    }

    fn run_body(&self, body: &'p [Node], frame: &mut Frame<'p>) -> Result<Outcome, EvalError> {
        match self.exec_block(body, frame)? {
            Flow::Exit(outcome) => Ok(outcome),
            Flow::Next => Err(EvalError::Shape {
                expected: "return",
                found: "end of body",
            }),
        }
    }

    fn exec_block(&self, body: &'p [Node], frame: &mut Frame<'p>) -> Result<Flow, EvalError> {
        for node in body {
            if let Flow::Exit(outcome) = self.exec(node, frame)? {
                return Ok(Flow::Exit(outcome));
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&self, node: &'p Node, frame: &mut Frame<'p>) -> Result<Flow, EvalError> {
        match node {
            Node::AssignDirect { dest, src } => {
                let value = self.eval(src, frame)?;
                frame.assign(dest, value)?;
            }
            Node::AssignCast { dest, src, ty } => {
                let value = self.eval(src, frame)?;
                let types = &self.program.types;
                let converted = match types.kind(types.underlying(*ty)) {
                    TypeKind::Scalar(scalar) => {
                        convert_scalar(&value, *scalar).ok_or(EvalError::Shape {
                            expected: scalar.name(),
                            found: value.type_name(),
                        })?
                    }
                    _ => value,
                };
                frame.assign(dest, converted)?;
            }
            Node::CallCustomFunction {
                dest,
                function,
                arg,
                may_fail,
            } => {
                let arg = self.eval(arg, frame)?;
                let outcome = self.call_function(function, &arg, *may_fail)?;
                return self.store_or_fail(dest, outcome, frame);
            }
            Node::CallInterfaceMethod { dest, method, arg, ctx, .. } => {
                let outcome = self.call_sibling(method, arg, ctx.as_deref(), frame)?;
                return self.store_or_fail(dest, outcome, frame);
            }
            Node::CallHelper { dest, helper, arg, ctx, .. } => {
                let arg = self.eval(arg, frame)?;
                let ctx = self.ctx_value(ctx.as_deref(), frame)?;
                let outcome = self.call_helper(helper, ctx, arg)?;
                return self.store_or_fail(dest, outcome, frame);
            }
            Node::MapSequence {
                dest,
                src,
                dest_type,
                elem_type,
                vars,
                fixed_len,
                body,
                ..
            } => {
                let items = match (self.eval(src, frame)?, fixed_len) {
                    (Value::Nil, None) => return Ok(Flow::Next),
                    (Value::Seq(items), None) => items,
                    (Value::Array(items), Some(_)) => items,
                    (other, _) => {
                        return Err(EvalError::Shape {
                            expected: if fixed_len.is_some() { "array" } else { "slice" },
                            found: other.type_name(),
                        })
                    }
                };
                let elem_zero = zero_value(&self.program.types, *elem_type);
                let fresh = match fixed_len {
                    Some(_) => zero_value(&self.program.types, *dest_type),
                    None => Value::Seq(vec![elem_zero.clone(); items.len()]),
                };
                frame.assign(dest, fresh)?;
                for (i, item) in items.into_iter().enumerate() {
                    let key = Value::Int(i as i64);
                    if let Flow::Exit(outcome) = self.exec_element(dest, key, item, &elem_zero, vars, body, frame)? {
                        return Ok(Flow::Exit(outcome));
                    }
                }
            }
            Node::MapAssociative {
                dest,
                src,
                value_type,
                vars,
                body,
                ..
            } => {
                let entries = match self.eval(src, frame)? {
                    Value::Nil => return Ok(Flow::Next),
                    Value::Map(entries) => entries,
                    other => {
                        return Err(EvalError::Shape {
                            expected: "map",
                            found: other.type_name(),
                        })
                    }
                };
                let value_zero = zero_value(&self.program.types, *value_type);
                frame.assign(dest, Value::Map(Default::default()))?;
                for (key, item) in entries {
                    if let Flow::Exit(outcome) =
                        self.exec_element(dest, key.to_value(), item, &value_zero, vars, body, frame)?
                    {
                        return Ok(Flow::Exit(outcome));
                    }
                }
            }
            Node::MapOptional {
                dest,
                src,
                payload_type,
                temp,
                body,
                ..
            } => {
                if self.eval(src, frame)?.is_nil() {
                    return Ok(Flow::Next);
                }
                frame.define(temp.as_str(), zero_value(&self.program.types, *payload_type));
                if let Flow::Exit(outcome) = self.exec_block(body, frame)? {
                    return Ok(Flow::Exit(outcome));
                }
                let mapped = frame.get(temp)?.clone();
                frame.assign(dest, Value::ptr(mapped))?;
            }
            Node::Unsupported { .. } | Node::FieldUnresolved { .. } => {}
            Node::DestInit { var, ty } => {
                frame.define(var.as_str(), zero_value(&self.program.types, *ty));
            }
            Node::GuardEarlyReturnIfNull { var, zero, .. } => {
                if frame.get(var)?.is_nil() {
                    return Ok(Flow::Exit(Outcome::ok(self.eval(zero, frame)?)));
                }
            }
            Node::Return { value, .. } => {
                let outcome = match value {
                    Expr::Call { .. } => self.eval_call(value, frame)?,
                    other => Outcome::ok(self.eval(other, frame)?),
                };
                return Ok(Flow::Exit(outcome));
            }
        }
        Ok(Flow::Next)
    }

    /// Convert one collection element and store it at `dest[key]`.
    #[allow(clippy::too_many_arguments)]
    fn exec_element(
        &self,
        dest: &Expr,
        key: Value,
        item: Value,
        zero: &Value,
        vars: &LoopVars,
        body: &'p [Node],
        frame: &mut Frame<'p>,
    ) -> Result<Flow, EvalError> {
        frame.define(vars.index.as_str(), key);
        frame.define(vars.elem.as_str(), item);
        frame.define(vars.mapped.as_str(), zero.clone());
        if let Flow::Exit(outcome) = self.exec_block(body, frame)? {
            return Ok(Flow::Exit(outcome));
        }
        let mapped = frame.get(&vars.mapped)?.clone();
        let slot = Expr::Index {
            base: Box::new(dest.clone()),
            index: vars.index.clone(),
        };
        frame.assign(&slot, mapped)?;
        Ok(Flow::Next)
    }

    /// Store a call result, or leave the frame with its failure value.
    fn store_or_fail(&self, dest: &Expr, outcome: Outcome, frame: &mut Frame<'p>) -> Result<Flow, EvalError> {
        match outcome.failure {
            Some(failure) => {
                log::trace!("failure: {failure}");
                let value = self.eval(frame.failure_value, frame)?;
                Ok(Flow::Exit(Outcome {
                    value,
                    failure: Some(failure),
                }))
            }
            None => {
                frame.assign(dest, outcome.value)?;
                Ok(Flow::Next)
            }
        }
    }

    fn call_function(&self, name: &str, arg: &Value, may_fail: bool) -> Result<Outcome, EvalError> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        match f(arg) {
            Ok(value) => Ok(Outcome::ok(value)),
            Err(message) if may_fail => Ok(Outcome {
                value: Value::Nil,
                failure: Some(message),
            }),
            Err(message) => Err(EvalError::UnexpectedFailure {
                function: name.to_string(),
                message,
            }),
        }
    }

    /// Call another method of the interface the current frame implements.
    fn call_sibling(&self, method: &str, arg: &Expr, ctx: Option<&str>, frame: &Frame<'p>) -> Result<Outcome, EvalError> {
        let iface = frame.interface.ok_or_else(|| EvalError::UnknownMethod {
            interface: String::new(),
            method: method.to_string(),
        })?;
        let target = iface.method(method).ok_or_else(|| EvalError::UnknownMethod {
            interface: iface.name.clone(),
            method: method.to_string(),
        })?;
        let arg = self.eval(arg, frame)?;
        let ctx = self.ctx_value(ctx, frame)?.unwrap_or(Value::Nil);
        let args = target
            .params
            .iter()
            .map(|p| if p.is_context { ctx.clone() } else { arg.clone() })
            .collect();
        self.run_method(iface, target, args)
    }

    fn ctx_value(&self, ctx: Option<&str>, frame: &Frame<'p>) -> Result<Option<Value>, EvalError> {
        ctx.map(|name| frame.get(name).cloned()).transpose()
    }

    fn eval_call(&self, expr: &Expr, frame: &Frame<'p>) -> Result<Outcome, EvalError> {
        let Expr::Call { callee, arg, ctx } = expr else {
            return Ok(Outcome::ok(self.eval(expr, frame)?));
        };
        match callee {
            Callee::Helper(name) => {
                let arg = self.eval(arg, frame)?;
                let ctx = self.ctx_value(ctx.as_deref(), frame)?;
                self.call_helper(name, ctx, arg)
            }
            Callee::Function(name) => {
                let arg = self.eval(arg, frame)?;
                self.call_function(name, &arg, true)
            }
            Callee::Method(name) => self.call_sibling(name, arg, ctx.as_deref(), frame),
        }
    }

    fn eval(&self, expr: &Expr, frame: &Frame<'p>) -> Result<Value, EvalError> {
        match expr {
            Expr::Var(name) => frame.get(name).cloned(),
            Expr::Field { base, name } => {
                let base = self.eval(base, frame)?;
                match &base {
                    Value::Nil => Err(EvalError::NilDereference),
                    Value::Record(_) | Value::Ptr(_) => base.field(name).cloned().ok_or_else(|| EvalError::NoSuchField {
                        field: name.clone(),
                        found: base.type_name().to_string(),
                    }),
                    other => Err(EvalError::NoSuchField {
                        field: name.clone(),
                        found: other.type_name().to_string(),
                    }),
                }
            }
            Expr::Deref(inner) => match self.eval(inner, frame)? {
                Value::Ptr(value) => Ok(*value),
                Value::Nil => Err(EvalError::NilDereference),
                other => Err(EvalError::Shape {
                    expected: "pointer",
                    found: other.type_name(),
                }),
            },
            Expr::AddrOf(inner) => Ok(Value::ptr(self.eval(inner, frame)?)),
            Expr::Index { base, index } => {
                let key = frame.get(index)?;
                match self.eval(base, frame)? {
                    Value::Seq(items) | Value::Array(items) => {
                        let i = position(key)?;
                        let len = items.len();
                        items
                            .into_iter()
                            .nth(i)
                            .ok_or(EvalError::IndexOutOfRange { index: i, len })
                    }
                    Value::Map(entries) => Ok(MapKey::from_value(key)
                        .and_then(|k| entries.get(&k).cloned())
                        .unwrap_or(Value::Nil)),
                    other => Err(EvalError::Shape {
                        expected: "collection",
                        found: other.type_name(),
                    }),
                }
            }
            Expr::Call { callee, .. } => {
                let outcome = self.eval_call(expr, frame)?;
                match outcome.failure {
                    None => Ok(outcome.value),
                    Some(message) => Err(EvalError::UnexpectedFailure {
                        function: callee.name().to_string(),
                        message,
                    }),
                }
            }
            Expr::Zero(ty) => Ok(zero_value(&self.program.types, *ty)),
            Expr::Nil => Ok(Value::Nil),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_plan::{plan, PlanConfig};

    fn setup(json: &str, iface: &str) -> (Program, GenerationPlan) {
        let program = graft_model::from_json(json).unwrap();
        let plan = plan(&program, &PlanConfig::new([iface])).unwrap();
        (program, plan)
    }

    const SIBLINGS: &str = r#"{
        "package": "s",
        "types": [
            { "name": "Inner", "fields": [ { "name": "N", "type": "int" } ] },
            { "name": "InnerDTO", "fields": [ { "name": "N", "type": "int64" } ] },
            { "name": "Outer", "fields": [ { "name": "In", "type": "Inner" }, { "name": "Ids", "type": "[]uint8" } ] },
            { "name": "OuterDTO", "fields": [ { "name": "In", "type": "InnerDTO" }, { "name": "Ids", "type": "[]uint8" } ] }
        ],
        "interfaces": [ { "name": "M", "methods": [
            { "name": "Inner", "params": [ { "type": "Inner" } ], "results": ["InnerDTO"] },
            { "name": "Outer", "params": [ { "type": "Outer" }, { "name": "extra", "type": "Inner" } ], "results": ["OuterDTO"] }
        ] } ]
    }"#;

    #[test]
    fn sibling_methods_are_called_through_the_receiver() {
        let (program, plan) = setup(SIBLINGS, "M");
        let interp = Interpreter::new(&plan, &program, Functions::new());
        let outer = Value::record([
            ("In", Value::record([("N", Value::Int(4))])),
            ("Ids", Value::Seq(vec![Value::Uint(1)])),
        ]);
        let extra = Value::record([("N", Value::Int(0))]);
        let out = interp.call_method("M", "Outer", vec![outer, extra]).unwrap();
        assert_eq!(
            out.value,
            Value::record([
                ("In", Value::record([("N", Value::Int(4))])),
                ("Ids", Value::Seq(vec![Value::Uint(1)])),
            ])
        );
        assert!(!out.is_failure());
    }

    #[test]
    fn arity_and_lookup_errors() {
        let (program, plan) = setup(SIBLINGS, "M");
        let interp = Interpreter::new(&plan, &program, Functions::new());
        assert!(matches!(
            interp.call_method("M", "Inner", vec![]),
            Err(EvalError::Arity { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            interp.call_method("M", "Nope", vec![]),
            Err(EvalError::UnknownMethod { .. })
        ));
        assert_eq!(
            interp.call_helper("map_000000000000", None, Value::Nil),
            Err(EvalError::UnknownHelper("map_000000000000".into()))
        );
    }

    #[test]
    fn missing_function_is_an_error() {
        let json = r#"{
            "package": "f",
            "types": [
                { "name": "A", "fields": [ { "name": "N", "type": "int" } ] },
                { "name": "B", "fields": [ { "name": "N", "type": "int" } ] }
            ],
            "functions": [ { "name": "AToB", "params": [ { "type": "A" } ], "results": ["B"] } ],
            "interfaces": [ { "name": "M", "methods": [
                { "name": "Map", "params": [ { "type": "A" } ], "results": ["B"] }
            ] } ]
        }"#;
        let (program, plan) = setup(json, "M");
        let interp = Interpreter::new(&plan, &program, Functions::new());
        let a = Value::record([("N", Value::Int(1))]);
        assert_eq!(
            interp.call_method("M", "Map", vec![a.clone()]),
            Err(EvalError::UnknownFunction("AToB".into()))
        );

        let mut funcs = Functions::new();
        funcs.register("AToB", |_| Err("boom".to_string()));
        let interp = Interpreter::new(&plan, &program, funcs);
        assert!(matches!(
            interp.call_method("M", "Map", vec![a]),
            Err(EvalError::UnexpectedFailure { .. })
        ));
    }
}
