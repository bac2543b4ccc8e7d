// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Errors in executing a plan, as opposed to failures the mapped code
/// itself reports.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("unknown interface method {interface}.{method}")]
    UnknownMethod { interface: String, method: String },

    #[error("unknown helper {0}")]
    UnknownHelper(String),

    #[error("no implementation registered for function {0}")]
    UnknownFunction(String),

    #[error("unbound variable {0}")]
    Unbound(String),

    #[error("{callee}: expected {expected} arguments, got {got}")]
    Arity {
        callee: String,
        expected: usize,
        got: usize,
    },

    #[error("nil dereference")]
    NilDereference,

    #[error("no field {field} on {found}")]
    NoSuchField { field: String, found: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{function} cannot fail but returned: {message}")]
    UnexpectedFailure { function: String, message: String },
}
