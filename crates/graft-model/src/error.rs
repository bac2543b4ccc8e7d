// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Model loading errors.

/// An error raised while building or loading a [`Program`](crate::Program).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid model file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown type '{name}' in {context}")]
    UnknownType { name: String, context: String },
    #[error("invalid type expression '{expr}': {reason}")]
    InvalidTypeExpr { expr: String, reason: String },
    #[error("duplicate declaration of '{0}'")]
    Duplicate(String),
    #[error("type '{0}' must declare exactly one of `fields` or `underlying`")]
    AmbiguousDefinition(String),
    #[error("type '{0}' is not a declared type")]
    NotNamed(String),
    #[error("type '{0}' is defined in terms of itself")]
    CyclicDefinition(String),
}
