// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Go code generation for mapping plans.
//!
//! The emitter is a pure function of the plan: it never decides how a
//! field is mapped, it only spells out what the planner chose.

mod config;
mod expr;
mod printer;

pub use config::EmitOptions;
pub use expr::{zero_literal, GoExpr};

use graft_model::Program;
use graft_plan::GenerationPlan;

/// Render `plan` as a complete Go source file.
pub fn emit(plan: &GenerationPlan, program: &Program, options: &EmitOptions) -> String {
    let mut p = printer::Printer::new(plan, program, options);
    p.format_file();
    p.finish()
}
