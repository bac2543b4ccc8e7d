// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Interface method planning.

use graft_model::{FuncDecl, InterfaceDecl, TypeId, TypeTable};

use crate::error::{MethodError, MethodErrorKind};
use crate::fields::{selects_source, FieldScope, SourceParam};
use crate::ir::{Callee, Expr, Node};
use crate::session::{PlanSession, Site};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPlan {
    /// Declared name, or `p{index}` for unnamed parameters.
    pub name: String,
    pub ty: TypeId,
    pub is_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// Record (or pointer to record) result.
    Struct,
    /// Collection to collection.
    Composite,
}

#[derive(Debug, Clone)]
pub struct MethodPlan {
    pub name: String,
    pub params: Vec<ParamPlan>,
    pub context_param: Option<usize>,
    pub primary_param: usize,
    pub result: TypeId,
    /// The method returns `error` as its second result.
    pub fallible: bool,
    pub kind: MappingKind,
    /// Returned alongside a failure raised inside the body.
    pub failure_value: Expr,
    pub body: Vec<Node>,
}

impl MethodPlan {
    pub fn context_name(&self) -> Option<&str> {
        self.context_param.map(|i| self.params[i].name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct InterfacePlan {
    pub name: String,
    /// Name of the generated implementation type.
    pub impl_name: String,
    pub methods: Vec<MethodPlan>,
}

impl InterfacePlan {
    pub fn method(&self, name: &str) -> Option<&MethodPlan> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// `UserMapper` becomes `userMapperImpl`.
pub fn impl_name(interface: &str) -> String {
    let mut chars = interface.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>() + "Impl",
        None => "Impl".to_string(),
    }
}

/// Validated method signature.
#[derive(Debug)]
pub(crate) struct Signature {
    pub params: Vec<ParamPlan>,
    pub context_param: Option<usize>,
    pub primary_param: usize,
    pub result: TypeId,
    pub fallible: bool,
    pub kind: MappingKind,
}

pub(crate) fn check_signature(
    types: &TypeTable,
    package: &str,
    method: &FuncDecl,
) -> Result<Signature, MethodErrorKind> {
    if method.params.is_empty() {
        return Err(MethodErrorKind::NoParameters);
    }
    let fallible = match method.results.as_slice() {
        [_] => false,
        [_, err] if types.is_error(*err) => true,
        [_, other] => {
            return Err(MethodErrorKind::SecondResultNotError(
                types.display(*other, package).to_string(),
            ))
        }
        results => return Err(MethodErrorKind::ResultArity(results.len())),
    };

    let params: Vec<ParamPlan> = method
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| ParamPlan {
            name: p.name.clone().unwrap_or_else(|| format!("p{i}")),
            ty: p.ty,
            is_context: types.is_context(p.ty),
        })
        .collect();
    let context_param = params.iter().position(|p| p.is_context);

    let mappable = |ty: TypeId| {
        types.is_record_like(ty) || types.optional_record(ty).is_some() || types.shape(ty).is_collection()
    };
    let primary_param = params
        .iter()
        .position(|p| !p.is_context && mappable(p.ty))
        .ok_or(MethodErrorKind::NoMappableParameter)?;

    let result = method.results[0];
    let source = params[primary_param].ty;
    let kind = if types.is_record_like(result) || types.optional_record(result).is_some() {
        MappingKind::Struct
    } else if types.shape(result).is_collection() && types.shape(source).is_collection() {
        MappingKind::Composite
    } else {
        return Err(MethodErrorKind::UnsupportedTopLevel {
            source: types.display(source, package).to_string(),
            dest: types.display(result, package).to_string(),
        });
    };

    Ok(Signature {
        params,
        context_param,
        primary_param,
        result,
        fallible,
        kind,
    })
}

impl PlanSession<'_> {
    pub(crate) fn plan_method(
        &mut self,
        iface: &InterfaceDecl,
        method: &FuncDecl,
    ) -> Result<MethodPlan, MethodError> {
        let program = self.program;
        let sig = check_signature(&program.types, &program.package, method).map_err(|kind| {
            MethodError {
                interface: iface.name.clone(),
                method: method.name.clone(),
                kind,
            }
        })?;
        log::debug!("planning {}.{}", iface.name, method.name);

        let site = Site {
            interface: Some(iface.name.clone()),
            method: Some(method.name.clone()),
            ctx: sig.context_param.map(|i| sig.params[i].name.clone()),
        };

        let (body, failure_value) = match sig.kind {
            MappingKind::Composite => {
                let param = &sig.params[sig.primary_param];
                let helper = self.ensure_collection_helper(param.ty, sig.result);
                let call = Expr::call(Callee::Helper(helper), Expr::var(&param.name), site.ctx.clone());
                (vec![ret(call, sig.fallible)], Expr::Zero(sig.result))
            }
            MappingKind::Struct => {
                let (sources, primary) = source_params(&program.types, &sig, method);
                let dest_record = program.types.optional_record(sig.result).unwrap_or(sig.result);
                if sources.len() == 1 && !selects_source(&program.types, dest_record, &sources) {
                    self.plan_delegating(&sig, &site)
                } else {
                    self.plan_inline(&sig, &sources, primary, &site)
                }
            }
        };

        Ok(MethodPlan {
            name: method.name.clone(),
            params: sig.params,
            context_param: sig.context_param,
            primary_param: sig.primary_param,
            result: sig.result,
            fallible: sig.fallible,
            kind: sig.kind,
            failure_value,
            body,
        })
    }

    /// Single-source method: call a custom function or one helper.
    fn plan_delegating(&mut self, sig: &Signature, site: &Site) -> (Vec<Node>, Expr) {
        let types = self.types();
        let param = &sig.params[sig.primary_param];
        let (src, dst) = (param.ty, sig.result);
        let arg = Expr::var(&param.name);

        if let Some(entry) = self.registry.custom_function(src, dst, sig.fallible).cloned() {
            let body = vec![
                Node::DestInit {
                    var: "dst".to_string(),
                    ty: dst,
                },
                Node::CallCustomFunction {
                    dest: Expr::var("dst"),
                    function: entry.provider,
                    arg,
                    may_fail: entry.returns_failure,
                },
                ret(Expr::var("dst"), sig.fallible),
            ];
            return (body, Expr::var("dst"));
        }

        let mut body = Vec::new();
        let (helper, arg) = match (types.optional_record(src), types.optional_record(dst)) {
            (Some(src_payload), None) => {
                body.push(Node::GuardEarlyReturnIfNull {
                    var: param.name.clone(),
                    zero: Expr::Zero(dst),
                    may_fail: false,
                });
                (self.ensure_struct_helper(src_payload, dst), arg.deref())
            }
            _ => (self.ensure_struct_helper(src, dst), arg),
        };
        let call = Expr::call(Callee::Helper(helper), arg, site.ctx.clone());
        body.push(ret(call, sig.fallible));
        (body, Expr::Zero(dst))
    }

    /// Fields resolved inline across parameters: multi-source methods, or a
    /// single source addressed by name from `mapsrc`.
    fn plan_inline(
        &mut self,
        sig: &Signature,
        sources: &[SourceParam],
        primary: usize,
        site: &Site,
    ) -> (Vec<Node>, Expr) {
        let types = self.types();
        let (dest_var, dest_record, value) = match types.optional_record(sig.result) {
            Some(payload) => ("mapped", payload, Expr::var("mapped").addr_of()),
            None => ("dst", sig.result, Expr::var("dst")),
        };
        let zero = if dest_var == "mapped" {
            Expr::Nil
        } else {
            Expr::Zero(sig.result)
        };

        let mut body = Vec::new();
        for param in sig.params.iter().filter(|p| !p.is_context) {
            if types.optional_record(param.ty).is_some() {
                body.push(Node::GuardEarlyReturnIfNull {
                    var: param.name.clone(),
                    zero: zero.clone(),
                    may_fail: false,
                });
            }
        }

        body.push(Node::DestInit {
            var: dest_var.to_string(),
            ty: dest_record,
        });
        let scope = FieldScope {
            dest: Expr::var(dest_var),
            sources,
            primary,
            selectors: true,
            site,
        };
        body.extend(self.resolve_fields(dest_record, &scope));
        let failure_value = value.clone();
        body.push(ret(value, sig.fallible));
        (body, failure_value)
    }
}

/// Non-context parameters in declaration order, and the index of the
/// primary one among them.
fn source_params(types: &TypeTable, sig: &Signature, method: &FuncDecl) -> (Vec<SourceParam>, usize) {
    let mut sources = Vec::new();
    let mut primary = 0;
    for (index, param) in sig.params.iter().enumerate() {
        if param.is_context {
            continue;
        }
        if index == sig.primary_param {
            primary = sources.len();
        }
        let record = if types.is_record_like(param.ty) {
            Some((Expr::var(&param.name), param.ty))
        } else {
            types
                .optional_record(param.ty)
                .map(|payload| (Expr::var(&param.name).deref(), payload))
        };
        sources.push(SourceParam {
            declared_name: method.params[index].name.clone(),
            position: sources.len(),
            value: Expr::var(&param.name),
            value_type: param.ty,
            record,
        });
    }
    (sources, primary)
}

fn ret(value: Expr, may_fail: bool) -> Node {
    Node::Return {
        value,
        may_fail,
        forwards_failure: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::Program;

    fn program() -> Program {
        graft_model::from_json(
            r#"{
            "package": "p",
            "types": [
                { "name": "A", "fields": [ { "name": "X", "type": "int" } ] },
                { "name": "B", "fields": [ { "name": "X", "type": "int" } ] }
            ],
            "interfaces": [ { "name": "M", "methods": [
                { "name": "Ok", "params": [ { "type": "context.Context" }, { "name": "a", "type": "*A" } ],
                  "results": ["B", "error"] },
                { "name": "NoParams", "results": ["B"] },
                { "name": "ThreeResults", "params": [ { "type": "A" } ], "results": ["B", "B", "error"] },
                { "name": "BadSecond", "params": [ { "type": "A" } ], "results": ["B", "A"] },
                { "name": "OnlyScalars", "params": [ { "type": "int" } ], "results": ["B"] },
                { "name": "ToScalar", "params": [ { "type": "A" } ], "results": ["int"] },
                { "name": "Slices", "params": [ { "type": "[]A" } ], "results": ["[]B"] }
            ] } ]
        }"#,
        )
        .unwrap()
    }

    fn check(p: &Program, name: &str) -> Result<Signature, MethodErrorKind> {
        let method = p.interface("M").unwrap().method(name).unwrap();
        check_signature(&p.types, &p.package, method)
    }

    #[test]
    fn signature_finds_context_and_primary() {
        let p = program();
        let sig = check(&p, "Ok").unwrap();
        assert_eq!(sig.context_param, Some(0));
        assert_eq!(sig.primary_param, 1);
        assert_eq!(sig.params[0].name, "p0");
        assert_eq!(sig.params[1].name, "a");
        assert!(sig.fallible);
        assert_eq!(sig.kind, MappingKind::Struct);
    }

    #[test]
    fn signature_errors() {
        let p = program();
        assert_eq!(check(&p, "NoParams").unwrap_err(), MethodErrorKind::NoParameters);
        assert_eq!(check(&p, "ThreeResults").unwrap_err(), MethodErrorKind::ResultArity(3));
        assert_eq!(
            check(&p, "BadSecond").unwrap_err(),
            MethodErrorKind::SecondResultNotError("A".to_string())
        );
        assert_eq!(check(&p, "OnlyScalars").unwrap_err(), MethodErrorKind::NoMappableParameter);
        assert!(matches!(
            check(&p, "ToScalar").unwrap_err(),
            MethodErrorKind::UnsupportedTopLevel { .. }
        ));
    }

    #[test]
    fn collections_are_composite() {
        let p = program();
        assert_eq!(check(&p, "Slices").unwrap().kind, MappingKind::Composite);
    }

    #[test]
    fn impl_names_lowercase_first_letter() {
        assert_eq!(impl_name("UserMapper"), "userMapperImpl");
        assert_eq!(impl_name("X"), "xImpl");
    }
}
