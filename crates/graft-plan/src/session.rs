// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Planning session: owns all mutable state of one generation run.

use graft_model::{InterfaceDecl, Program, TypeId, TypeTable};

use crate::analysis;
use crate::config::PlanConfig;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{MethodError, MethodErrorKind, PlanError};
use crate::helpers::{HelperPlan, HelperTable};
use crate::ir::LoopVars;
use crate::methods::{impl_name, InterfacePlan, MethodPlan};
use crate::registry::Registry;

/// Where a conversion is being planned.
#[derive(Debug, Clone, Default)]
pub(crate) struct Site {
    /// Interface whose method body is being built, if any.
    pub interface: Option<String>,
    /// Method being built; a method never uses itself as a provider.
    pub method: Option<String>,
    /// Context variable in scope.
    pub ctx: Option<String>,
}

impl Site {
    pub fn helper(ctx: Option<String>) -> Self {
        Self {
            interface: None,
            method: None,
            ctx,
        }
    }
}

pub(crate) struct PlanSession<'p> {
    pub program: &'p Program,
    pub registry: Registry,
    pub helpers: HelperTable,
    /// Some requested method takes a context, so every helper does too.
    pub needs_context: bool,
    fresh: usize,
}

impl<'p> PlanSession<'p> {
    pub fn new(program: &'p Program, registry: Registry, needs_context: bool) -> Self {
        Self {
            program,
            registry,
            helpers: HelperTable::new(),
            needs_context,
            fresh: 0,
        }
    }

    pub fn types(&self) -> &'p TypeTable {
        &self.program.types
    }

    pub fn type_name(&self, id: TypeId) -> String {
        self.program.type_name(id)
    }

    fn next_fresh(&mut self) -> usize {
        self.fresh += 1;
        self.fresh
    }

    pub fn fresh_loop_vars(&mut self) -> LoopVars {
        let n = self.next_fresh();
        LoopVars {
            index: format!("i{n}"),
            elem: format!("v{n}"),
            mapped: format!("mapped{n}"),
        }
    }

    pub fn fresh_temp(&mut self) -> String {
        format!("mapped{}", self.next_fresh())
    }

    /// Context variable inside helper bodies.
    pub fn helper_ctx(&self) -> Option<String> {
        self.needs_context.then(|| "ctx".to_string())
    }
}

/// Everything an emitter needs for one run.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub package: String,
    pub interfaces: Vec<InterfacePlan>,
    pub helpers: Vec<HelperPlan>,
    pub needs_context: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationPlan {
    pub fn helper(&self, name: &str) -> Option<&HelperPlan> {
        self.helpers.iter().find(|h| h.name == name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfacePlan> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn method(&self, interface: &str, method: &str) -> Option<&MethodPlan> {
        self.interface(interface)?
            .methods
            .iter()
            .find(|m| m.name == method)
    }
}

/// Plan the implementation of every interface named in `config`.
pub fn plan(program: &Program, config: &PlanConfig) -> Result<GenerationPlan, PlanError> {
    let interfaces = select_interfaces(program, &config.interfaces)?;
    let types = &program.types;
    let needs_context = interfaces
        .iter()
        .flat_map(|i| &i.methods)
        .any(|m| m.params.iter().any(|p| types.is_context(p.ty)));

    let registry = Registry::build(program, &config.custom_funcs, &interfaces);
    log::debug!("registry holds {} providers", registry.len());

    let mut session = PlanSession::new(program, registry, needs_context);
    let mut plans = Vec::with_capacity(interfaces.len());
    for iface in &interfaces {
        let mut methods = Vec::with_capacity(iface.methods.len());
        for method in &iface.methods {
            methods.push(session.plan_method(iface, method)?);
        }
        plans.push(InterfacePlan {
            name: iface.name.clone(),
            impl_name: impl_name(&iface.name),
            methods,
        });
    }

    session.populate_helpers();
    let mut helpers = session.helpers.into_plans();

    let fallible = analysis::fallible_helpers(&helpers);
    analysis::annotate(&mut helpers, &mut plans, &fallible);

    for iface in &plans {
        for method in &iface.methods {
            if !method.fallible && analysis::needs_failure_path(&method.body, &fallible) {
                return Err(MethodError {
                    interface: iface.name.clone(),
                    method: method.name.clone(),
                    kind: MethodErrorKind::UnhandledFailure,
                }
                .into());
            }
        }
    }

    let diagnostics = diagnostics::collect(program, &plans, &helpers);
    Ok(GenerationPlan {
        package: program.package.clone(),
        interfaces: plans,
        helpers,
        needs_context,
        diagnostics,
    })
}

/// Resolve requested names to interfaces, in sorted order.
fn select_interfaces<'p>(
    program: &'p Program,
    names: &[String],
) -> Result<Vec<&'p InterfaceDecl>, PlanError> {
    let mut names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(PlanError::NoInterfaces);
    }
    names.sort_unstable();
    names.dedup();

    let mut found = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match program.interface(name) {
            Some(iface) => found.push(iface),
            None if program.types.lookup(name).is_some() => {
                return Err(PlanError::NotAnInterface(name.to_string()));
            }
            None => missing.push(name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(PlanError::MissingInterfaces(missing));
    }
    Ok(found)
}
