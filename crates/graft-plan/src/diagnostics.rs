// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Soft diagnostics gathered from planned bodies.

use std::fmt;

use graft_model::Program;

use crate::display::ExprDisplay;
use crate::helpers::HelperPlan;
use crate::ir::{walk, Node};
use crate::methods::InterfacePlan;

/// A problem that did not stop generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `Iface.Method` or `helper map_xxxx (A -> B)`.
    pub location: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

pub(crate) fn collect(program: &Program, interfaces: &[InterfacePlan], helpers: &[HelperPlan]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for iface in interfaces {
        for method in &iface.methods {
            let location = format!("{}.{}", iface.name, method.name);
            collect_body(program, &location, &method.body, &mut out);
        }
    }
    for helper in helpers {
        let location = format!(
            "helper {} ({} -> {})",
            helper.name,
            program.type_name(helper.source),
            program.type_name(helper.dest)
        );
        collect_body(program, &location, &helper.body, &mut out);
    }
    out
}

fn collect_body(program: &Program, location: &str, body: &[Node], out: &mut Vec<Diagnostic>) {
    walk(body, &mut |node| {
        let message = match node {
            Node::Unsupported {
                dest,
                src_type,
                dest_type,
            } => format!(
                "cannot map {} to {} for {}",
                program.type_name(*src_type),
                program.type_name(*dest_type),
                ExprDisplay::new(dest, program)
            ),
            Node::FieldUnresolved { reason, .. } => reason.clone(),
            _ => return,
        };
        out.push(Diagnostic {
            location: location.to_string(),
            message,
        });
    });
}
