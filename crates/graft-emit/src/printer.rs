// SPDX-License-Identifier: (MIT OR Apache-2.0)

use graft_model::{Program, TypeId};
use graft_plan::ir::walk;
use graft_plan::{Callee, Expr, GenerationPlan, HelperPlan, InterfacePlan, MethodPlan, Node};

use crate::config::EmitOptions;
use crate::expr::GoExpr;

const BACKGROUND: &str = "context.Background()";

pub struct Printer<'a> {
    output: String,
    indent: usize,
    plan: &'a GenerationPlan,
    program: &'a Program,
    options: &'a EmitOptions,
    /// Value returned next to `err` by the function being printed.
    failure: &'a Expr,
    /// Interface of the method being printed; `None` inside helpers.
    interface: Option<&'a InterfacePlan>,
}

impl<'a> Printer<'a> {
    pub fn new(plan: &'a GenerationPlan, program: &'a Program, options: &'a EmitOptions) -> Self {
        static NIL: Expr = Expr::Nil;
        Self {
            output: String::new(),
            indent: 0,
            plan,
            program,
            options,
            failure: &NIL,
            interface: None,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn emit(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn emit_newline(&mut self) {
        self.output.push('\n');
    }

    fn emit_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push('\t');
        }
    }

    fn emit_line(&mut self, s: &str) {
        self.emit_indent();
        self.emit(s);
        self.emit_newline();
    }

    fn emit_blank_line(&mut self) {
        if self.output.is_empty() || self.output.ends_with("\n\n") {
            return;
        }
        self.emit_newline();
    }

    fn open(&mut self, header: &str) {
        self.emit_line(&format!("{header} {{"));
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent -= 1;
        self.emit_line("}");
    }

    fn ty(&self, id: TypeId) -> String {
        self.program.types.display(id, &self.program.package).to_string()
    }

    fn expr(&self, expr: &Expr) -> String {
        GoExpr::new(expr, self.program).to_string()
    }

    pub fn format_file(&mut self) {
        let plan = self.plan;
        let sources: Vec<&str> = plan.interfaces.iter().map(|i| i.name.as_str()).collect();
        self.emit_line(&format!(
            "// Code generated by graftgen {}. DO NOT EDIT.",
            self.options.version
        ));
        self.emit_line(&format!("// Command: {}", self.options.command));
        self.emit_line(&format!("// Source: {}", sources.join(", ")));
        self.emit_blank_line();
        self.emit_line(&format!("package {}", plan.package));
        if plan.needs_context {
            self.emit_blank_line();
            self.emit_line("import \"context\"");
        }

        for (index, iface) in plan.interfaces.iter().enumerate() {
            self.emit_blank_line();
            self.format_interface(index, iface);
        }
        for (index, helper) in plan.helpers.iter().enumerate() {
            self.emit_blank_line();
            self.format_helper(index, helper);
        }
    }

    fn format_interface(&mut self, index: usize, iface: &'a InterfacePlan) {
        self.emit_line(&format!("type {} struct{{}}", iface.impl_name));
        self.emit_blank_line();
        self.emit_line(&format!(
            "// New{0} returns the generated implementation of {0}.",
            iface.name
        ));
        self.open(&format!("func New{0}() {0}", iface.name));
        self.emit_line(&format!("return &{}{{}}", iface.impl_name));
        self.close();

        self.interface = Some(iface);
        for (mi, method) in iface.methods.iter().enumerate() {
            self.emit_blank_line();
            self.format_method(&format!("I{index}.M{mi}"), iface, method);
        }
        self.interface = None;
    }

    fn format_method(&mut self, path: &str, iface: &InterfacePlan, method: &'a MethodPlan) {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, self.ty(p.ty)))
            .collect();
        let result = self.ty(method.result);
        let results = if method.fallible {
            format!("({result}, error)")
        } else {
            result
        };
        self.open(&format!(
            "func (m *{}) {}({}) {results}",
            iface.impl_name,
            method.name,
            params.join(", ")
        ));
        self.failure = &method.failure_value;
        self.format_body(path, &method.body);
        self.close();
    }

    fn format_helper(&mut self, index: usize, helper: &'a HelperPlan) {
        let mut params = Vec::new();
        if helper.has_context {
            params.push("ctx context.Context".to_string());
        }
        params.push(format!("in {}", self.ty(helper.source)));
        let dest = self.ty(helper.dest);
        let results = if helper.fallible {
            format!("({dest}, error)")
        } else {
            dest
        };
        self.open(&format!("func {}({}) {results}", helper.name, params.join(", ")));
        self.failure = &helper.failure_value;
        self.format_body(&format!("H{index}"), &helper.body);
        self.close();
    }

    fn format_body(&mut self, path: &str, body: &'a [Node]) {
        if needs_err(body) {
            self.emit_line("var err error");
        }
        self.format_nodes(path, body);
    }

    fn format_nodes(&mut self, path: &str, nodes: &'a [Node]) {
        for (i, node) in nodes.iter().enumerate() {
            let path = format!("{path}.{i}");
            if self.options.debug {
                self.emit_line(&format!("// {path}"));
            }
            self.format_node(&path, node);
        }
    }

    fn format_node(&mut self, path: &str, node: &'a Node) {
        match node {
            Node::AssignDirect { dest, src } => {
                let line = format!("{} = {}", self.expr(dest), self.expr(src));
                self.emit_line(&line);
            }
            Node::AssignCast { dest, src, ty } => {
                let mut target = self.ty(*ty);
                if target.starts_with('*') {
                    target = format!("({target})");
                }
                let line = format!("{} = {target}({})", self.expr(dest), self.expr(src));
                self.emit_line(&line);
            }
            Node::CallCustomFunction {
                dest,
                function,
                arg,
                may_fail,
            } => {
                let call = format!("{function}({})", self.expr(arg));
                self.format_call(dest, &call, *may_fail);
            }
            Node::CallInterfaceMethod {
                dest,
                method,
                arg,
                ctx,
                may_fail,
            } => {
                let call = self.method_call(method, arg, ctx.as_deref());
                self.format_call(dest, &call, *may_fail);
            }
            Node::CallHelper {
                dest,
                helper,
                arg,
                ctx,
                may_fail,
            } => {
                let call = self.helper_call(helper, arg, ctx.as_deref());
                self.format_call(dest, &call, *may_fail);
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
                let (dest, src) = (self.expr(dest), self.expr(src));
                if fixed_len.is_none() {
                    self.open(&format!("if {src} != nil"));
                    let make = format!("{dest} = make({}, len({src}))", self.ty(*dest_type));
                    self.emit_line(&make);
                }
                self.open(&format!("for {}, {} := range {src}", vars.index, vars.elem));
                let decl = format!("var {} {}", vars.mapped, self.ty(*elem_type));
                self.emit_line(&decl);
                self.format_loop_body(path, &vars.elem, body);
                self.emit_line(&format!("{dest}[{}] = {}", vars.index, vars.mapped));
                self.close();
                if fixed_len.is_none() {
                    self.close();
                }
            }
            Node::MapAssociative {
                dest,
                src,
                dest_type,
                value_type,
                vars,
                body,
                ..
            } => {
                let (dest, src) = (self.expr(dest), self.expr(src));
                self.open(&format!("if {src} != nil"));
                let make = format!("{dest} = make({}, len({src}))", self.ty(*dest_type));
                self.emit_line(&make);
                self.open(&format!("for {}, {} := range {src}", vars.index, vars.elem));
                let decl = format!("var {} {}", vars.mapped, self.ty(*value_type));
                self.emit_line(&decl);
                self.format_loop_body(path, &vars.elem, body);
                self.emit_line(&format!("{dest}[{}] = {}", vars.index, vars.mapped));
                self.close();
                self.close();
            }
            Node::MapOptional {
                dest,
                src,
                payload_type,
                temp,
                body,
                ..
            } => {
                let (dest, src) = (self.expr(dest), self.expr(src));
                self.open(&format!("if {src} != nil"));
                let decl = format!("var {temp} {}", self.ty(*payload_type));
                self.emit_line(&decl);
                self.format_nodes(path, body);
                self.emit_line(&format!("{dest} = &{temp}"));
                self.close();
            }
            Node::Unsupported {
                dest,
                src_type,
                dest_type,
            } => {
                let line = format!(
                    "// unsupported: cannot map {} to {} for {}",
                    self.ty(*src_type),
                    self.ty(*dest_type),
                    self.expr(dest)
                );
                self.emit_line(&line);
            }
            Node::FieldUnresolved { field, reason } => {
                self.emit_line(&format!("// unresolved {field}: {reason}"));
            }
            Node::DestInit { var, ty } => {
                let line = format!("var {var} {}", self.ty(*ty));
                self.emit_line(&line);
            }
            Node::GuardEarlyReturnIfNull { var, zero, may_fail } => {
                self.open(&format!("if {var} == nil"));
                let zero = self.expr(zero);
                if *may_fail {
                    self.emit_line(&format!("return {zero}, nil"));
                } else {
                    self.emit_line(&format!("return {zero}"));
                }
                self.close();
            }
            Node::Return {
                value,
                may_fail,
                forwards_failure,
            } => {
                let value = match value {
                    Expr::Call { .. } => self.call_expr(value),
                    other => self.expr(other),
                };
                let line = if *forwards_failure {
                    format!("return {value}")
                } else if *may_fail {
                    format!("return {value}, nil")
                } else {
                    format!("return {value}")
                };
                self.emit_line(&line);
            }
        }
    }

    /// Loop bodies that only carry diagnostics still have to use the element.
    fn format_loop_body(&mut self, path: &str, elem: &str, body: &'a [Node]) {
        self.format_nodes(path, body);
        if body.iter().all(Node::is_diagnostic) {
            self.emit_line(&format!("_ = {elem}"));
        }
    }

    fn format_call(&mut self, dest: &Expr, call: &str, may_fail: bool) {
        let dest = self.expr(dest);
        if !may_fail {
            self.emit_line(&format!("{dest} = {call}"));
            return;
        }
        self.emit_line(&format!("{dest}, err = {call}"));
        self.open("if err != nil");
        let failure = self.expr(self.failure);
        self.emit_line(&format!("return {failure}, err"));
        self.close();
    }

    fn call_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Call { callee, arg, ctx } => match callee {
                Callee::Helper(name) => self.helper_call(name, arg, ctx.as_deref()),
                Callee::Method(name) => self.method_call(name, arg, ctx.as_deref()),
                Callee::Function(name) => format!("{name}({})", self.expr(arg)),
            },
            other => self.expr(other),
        }
    }

    fn helper_call(&self, name: &str, arg: &Expr, ctx: Option<&str>) -> String {
        let takes_ctx = self.plan.helper(name).is_some_and(|h| h.has_context);
        if takes_ctx {
            format!("{name}({}, {})", ctx.unwrap_or(BACKGROUND), self.expr(arg))
        } else {
            format!("{name}({})", self.expr(arg))
        }
    }

    /// Call a sibling method, passing the context wherever it declares one.
    fn method_call(&self, name: &str, arg: &Expr, ctx: Option<&str>) -> String {
        let arg = self.expr(arg);
        let target = self.interface.and_then(|i| i.method(name));
        let args: Vec<String> = match target {
            Some(method) => method
                .params
                .iter()
                .map(|p| {
                    if p.is_context {
                        ctx.unwrap_or(BACKGROUND).to_string()
                    } else {
                        arg.clone()
                    }
                })
                .collect(),
            None => vec![arg],
        };
        format!("m.{name}({})", args.join(", "))
    }
}

/// Whether `body` assigns a failure to `err` anywhere.
fn needs_err(body: &[Node]) -> bool {
    let mut found = false;
    walk(body, &mut |node| {
        if matches!(
            node,
            Node::CallCustomFunction { may_fail: true, .. }
                | Node::CallInterfaceMethod { may_fail: true, .. }
                | Node::CallHelper { may_fail: true, .. }
        ) {
            found = true;
        }
    });
    found
}

