// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Inputs of one planning run.
#[derive(Debug, Clone, Default)]
pub struct PlanConfig {
    /// Interfaces to implement.
    pub interfaces: Vec<String>,
    /// Free functions allowed as providers; empty admits every exported one.
    pub custom_funcs: Vec<String>,
}

impl PlanConfig {
    pub fn new<I, S>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interfaces: interfaces.into_iter().map(Into::into).collect(),
            custom_funcs: Vec::new(),
        }
    }

    pub fn with_custom_funcs<I, S>(mut self, funcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_funcs = funcs.into_iter().map(Into::into).collect();
        self
    }
}
