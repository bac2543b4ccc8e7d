// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declared functions, interfaces and the program that owns them.

use crate::table::TypeTable;
use crate::types::{is_exported, TypeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// `None` for unnamed parameters.
    pub name: Option<String>,
    pub ty: TypeId,
}

impl Param {
    pub fn new(name: Option<&str>, ty: TypeId) -> Self {
        Self {
            name: name.map(str::to_string),
            ty,
        }
    }
}

/// A free function or interface method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<TypeId>,
}

impl FuncDecl {
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// Single argument, one or two results with the second being `error`.
    pub fn is_conversion(&self, types: &TypeTable) -> bool {
        self.params.len() == 1
            && match self.results.as_slice() {
                [_] => true,
                [_, err] => types.is_error(*err),
                _ => false,
            }
    }

    /// Whether the signature ends in an `error` result.
    pub fn returns_failure(&self, types: &TypeTable) -> bool {
        self.results.len() == 2 && types.is_error(self.results[1])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<FuncDecl>,
}

impl InterfaceDecl {
    pub fn method(&self, name: &str) -> Option<&FuncDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Everything the planner can see about one package.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub package: String,
    pub types: TypeTable,
    pub functions: Vec<FuncDecl>,
    pub interfaces: Vec<InterfaceDecl>,
}

impl Program {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&FuncDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Go rendering of a type relative to this package.
    pub fn type_name(&self, id: TypeId) -> String {
        self.types.display(id, &self.package).to_string()
    }
}
