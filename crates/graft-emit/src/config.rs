// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Rendering switches and header metadata.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Precede every node with its path, e.g. `// H0.2.1`.
    pub debug: bool,
    /// Command line recorded in the file header.
    pub command: String,
    /// Generator version recorded in the file header.
    pub version: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            debug: false,
            command: "graftgen".to_string(),
            version: "dev".to_string(),
        }
    }
}
