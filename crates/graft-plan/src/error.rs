// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Generation-aborting planner errors.

use std::fmt;

/// A planning error. Soft problems (unresolved fields, unsupported pairs)
/// are reported as diagnostics instead.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no interfaces provided")]
    NoInterfaces,
    #[error("interfaces not found: {}", .0.join(", "))]
    MissingInterfaces(Vec<String>),
    #[error("{0} is not an interface")]
    NotAnInterface(String),
    #[error(transparent)]
    Method(#[from] MethodError),
}

/// An invalid interface method.
#[derive(Debug, thiserror::Error)]
#[error("{interface}.{method}: {kind}")]
pub struct MethodError {
    pub interface: String,
    pub method: String,
    pub kind: MethodErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodErrorKind {
    NoParameters,
    ResultArity(usize),
    SecondResultNotError(String),
    NoMappableParameter,
    UnsupportedTopLevel { source: String, dest: String },
    /// A nested conversion can fail but the method has no `error` result.
    UnhandledFailure,
}

impl fmt::Display for MethodErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodErrorKind::NoParameters => write!(f, "method must have at least one parameter"),
            MethodErrorKind::ResultArity(n) => {
                write!(f, "method must have 1 or 2 results, found {n}")
            }
            MethodErrorKind::SecondResultNotError(ty) => {
                write!(f, "second result must be error, found {ty}")
            }
            MethodErrorKind::NoMappableParameter => {
                write!(f, "no struct or collection parameter to map from")
            }
            MethodErrorKind::UnsupportedTopLevel { source, dest } => {
                write!(f, "unsupported top-level mapping from {source} to {dest}")
            }
            MethodErrorKind::UnhandledFailure => write!(
                f,
                "a nested conversion can fail but the method does not return an error"
            ),
        }
    }
}
