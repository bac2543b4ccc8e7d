// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type model for the graft mapping generator.
//!
//! Describes the record, collection, pointer and scalar types of one
//! package together with its free functions and interfaces. The planner
//! only reads from this model.

pub mod error;
pub mod load;
pub mod parse_type;
pub mod program;
pub mod table;
pub mod types;

pub use error::ModelError;
pub use load::{from_json, from_path};
pub use parse_type::parse_type_expr;
pub use program::{FuncDecl, InterfaceDecl, Param, Program};
pub use table::{TypeDisplay, TypeTable};
pub use types::{is_exported, Field, Scalar, Shape, TypeId, TypeKind};
