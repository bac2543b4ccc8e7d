// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Interpreter for mapping plans.
//!
//! Runs a [`GenerationPlan`](graft_plan::GenerationPlan) against dynamic
//! values so planned behavior can be checked without compiling generated
//! code. Custom functions are supplied by the host as closures.

mod env;
pub mod error;
pub mod interp;
pub mod value;

pub use error::EvalError;
pub use interp::{CustomFn, Functions, Interpreter, Outcome};
pub use value::{convert_scalar, zero_value, MapKey, Value};
