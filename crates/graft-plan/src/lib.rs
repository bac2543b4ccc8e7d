// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Type-directed mapping planner.
//!
//! Given a [`Program`](graft_model::Program) and the interfaces to
//! implement, [`plan`] decides how every method converts its sources into
//! its result: direct assignment, conversion, a registered provider, an
//! element-wise loop, or a synthesized helper. Helpers are memoized per
//! type pair so recursive types terminate, and a fixed-point pass marks
//! every helper that can fail.

pub mod analysis;
mod config;
mod diagnostics;
pub mod display;
mod error;
mod fields;
pub mod helpers;
pub mod ir;
mod methods;
pub mod registry;
mod resolve;
mod session;

pub use config::PlanConfig;
pub use diagnostics::Diagnostic;
pub use error::{MethodError, MethodErrorKind, PlanError};
pub use fields::{parse_tag, Annotations};
pub use helpers::{helper_name, HelperKind, HelperPlan};
pub use ir::{Callee, Expr, LoopVars, Node};
pub use methods::{impl_name, InterfacePlan, MappingKind, MethodPlan, ParamPlan};
pub use registry::{ProviderKind, Registry, RegistryEntry, Variant};
pub use session::{plan, GenerationPlan};
