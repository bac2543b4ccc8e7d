// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Human-readable rendering of planned IR.

use std::fmt::{self, Write};

use graft_model::Program;

use crate::helpers::{HelperKind, HelperPlan};
use crate::ir::{Callee, Expr, Node};
use crate::methods::MethodPlan;
use crate::session::GenerationPlan;

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Function(name) | Callee::Helper(name) => write!(f, "{name}"),
            Callee::Method(name) => write!(f, "m.{name}"),
        }
    }
}

/// Expression rendering with type names resolved against a program.
pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    program: &'a Program,
}

impl<'a> ExprDisplay<'a> {
    pub fn new(expr: &'a Expr, program: &'a Program) -> Self {
        Self { expr, program }
    }

    fn nested(&self, expr: &'a Expr) -> Self {
        Self::new(expr, self.program)
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Field { base, name } => write!(f, "{}.{name}", self.nested(base)),
            Expr::Deref(inner) => write!(f, "(*{})", self.nested(inner)),
            Expr::AddrOf(inner) => write!(f, "&{}", self.nested(inner)),
            Expr::Index { base, index } => write!(f, "{}[{index}]", self.nested(base)),
            Expr::Call { callee, arg, ctx } => match ctx {
                Some(ctx) => write!(f, "{callee}({ctx}, {})", self.nested(arg)),
                None => write!(f, "{callee}({})", self.nested(arg)),
            },
            Expr::Zero(ty) => write!(f, "zero({})", self.program.type_name(*ty)),
            Expr::Nil => write!(f, "nil"),
        }
    }
}

/// Render a whole plan, one node per line.
pub fn dump(plan: &GenerationPlan, program: &Program) -> String {
    let mut printer = PlanPrinter {
        out: String::new(),
        program,
    };
    printer.plan(plan);
    printer.out
}

struct PlanPrinter<'a> {
    out: String,
    program: &'a Program,
}

impl PlanPrinter<'_> {
    fn ty(&self, id: graft_model::TypeId) -> String {
        self.program.type_name(id)
    }

    fn expr<'e>(&'e self, expr: &'e Expr) -> ExprDisplay<'e> {
        ExprDisplay::new(expr, self.program)
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn plan(&mut self, plan: &GenerationPlan) {
        let _ = writeln!(self.out, "package {}", plan.package);
        if plan.needs_context {
            self.out.push_str("uses context\n");
        }
        for iface in &plan.interfaces {
            self.out.push('\n');
            let _ = writeln!(self.out, "interface {} ({})", iface.name, iface.impl_name);
            for method in &iface.methods {
                self.method(method);
            }
        }
        for helper in &plan.helpers {
            self.out.push('\n');
            self.helper(helper);
        }
        if !plan.diagnostics.is_empty() {
            self.out.push_str("\ndiagnostics\n");
            for diag in &plan.diagnostics {
                self.line(1, &diag.to_string());
            }
        }
    }

    fn method(&mut self, method: &MethodPlan) {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, self.ty(p.ty)))
            .collect();
        let fails = if method.fallible { ", error" } else { "" };
        let header = format!(
            "method {}({}) {}{fails} [{:?}]",
            method.name,
            params.join(", "),
            self.ty(method.result),
            method.kind
        );
        self.line(1, &header);
        self.body(2, &method.body);
    }

    fn helper(&mut self, helper: &HelperPlan) {
        let kind = match helper.kind {
            HelperKind::Record => "record",
            HelperKind::Collection => "collection",
        };
        let mut flags = vec![kind];
        if helper.fallible {
            flags.push("fallible");
        }
        if helper.has_context {
            flags.push("ctx");
        }
        let header = format!(
            "helper {} {} -> {} [{}]",
            helper.name,
            self.ty(helper.source),
            self.ty(helper.dest),
            flags.join(", ")
        );
        self.line(0, &header);
        self.body(1, &helper.body);
    }

    fn body(&mut self, depth: usize, body: &[Node]) {
        for node in body {
            self.node(depth, node);
        }
    }

    fn node(&mut self, depth: usize, node: &Node) {
        let fail = |may_fail: bool| if may_fail { " ?" } else { "" };
        let text = match node {
            Node::AssignDirect { dest, src } => {
                format!("{} = {}", self.expr(dest), self.expr(src))
            }
            Node::AssignCast { dest, src, ty } => {
                format!("{} = {}({})", self.expr(dest), self.ty(*ty), self.expr(src))
            }
            Node::CallCustomFunction {
                dest,
                function,
                arg,
                may_fail,
            } => format!(
                "{} = {function}({}){}",
                self.expr(dest),
                self.expr(arg),
                fail(*may_fail)
            ),
            Node::CallInterfaceMethod {
                dest,
                method,
                arg,
                may_fail,
                ..
            } => format!(
                "{} = m.{method}({}){}",
                self.expr(dest),
                self.expr(arg),
                fail(*may_fail)
            ),
            Node::CallHelper {
                dest,
                helper,
                arg,
                may_fail,
                ..
            } => format!(
                "{} = {helper}({}){}",
                self.expr(dest),
                self.expr(arg),
                fail(*may_fail)
            ),
            Node::MapSequence {
                dest,
                src,
                vars,
                fixed_len,
                body,
                may_fail,
                ..
            } => {
                let kind = match fixed_len {
                    Some(n) => format!("array[{n}]"),
                    None => "seq".to_string(),
                };
                let text = format!(
                    "{} = {kind} for {}, {} in {}{}",
                    self.expr(dest),
                    vars.index,
                    vars.elem,
                    self.expr(src),
                    fail(*may_fail)
                );
                self.line(depth, &text);
                self.body(depth + 1, body);
                return;
            }
            Node::MapAssociative {
                dest,
                src,
                vars,
                body,
                may_fail,
                ..
            } => {
                let text = format!(
                    "{} = map for {}, {} in {}{}",
                    self.expr(dest),
                    vars.index,
                    vars.elem,
                    self.expr(src),
                    fail(*may_fail)
                );
                self.line(depth, &text);
                self.body(depth + 1, body);
                return;
            }
            Node::MapOptional {
                dest,
                src,
                temp,
                body,
                may_fail,
                ..
            } => {
                let text = format!(
                    "{} = &{temp} unless {} is nil{}",
                    self.expr(dest),
                    self.expr(src),
                    fail(*may_fail)
                );
                self.line(depth, &text);
                self.body(depth + 1, body);
                return;
            }
            Node::Unsupported {
                dest,
                src_type,
                dest_type,
            } => format!(
                "unsupported {} = {} -> {}",
                self.expr(dest),
                self.ty(*src_type),
                self.ty(*dest_type)
            ),
            Node::FieldUnresolved { field, reason } => format!("unresolved {field}: {reason}"),
            Node::DestInit { var, ty } => format!("var {var} {}", self.ty(*ty)),
            Node::GuardEarlyReturnIfNull { var, zero, may_fail } => format!(
                "if {var} == nil return {}{}",
                self.expr(zero),
                fail(*may_fail)
            ),
            Node::Return {
                value,
                may_fail,
                forwards_failure,
            } => {
                let suffix = match (*forwards_failure, *may_fail) {
                    (true, _) => " (forward error)",
                    (false, true) => ", nil",
                    (false, false) => "",
                };
                format!("return {}{suffix}", self.expr(value))
            }
        };
        self.line(depth, &text);
    }
}
