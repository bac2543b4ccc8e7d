// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversion providers known before planning starts.
//!
//! Keys are ordered `(source, dest)` pairs. Each pair has a plain and a
//! fallible slot. Free functions returning `error` only fill the fallible
//! slot; everything else fills the plain slot. Interface methods are
//! back-filled into the plain slot when no free function covers the pair.

use std::collections::HashMap;

use graft_model::{FuncDecl, InterfaceDecl, Program, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Plain,
    Fallible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    CustomFunction,
    InterfaceMethod { interface: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub provider: String,
    pub returns_failure: bool,
    pub kind: ProviderKind,
}

impl RegistryEntry {
    pub fn is_custom_function(&self) -> bool {
        self.kind == ProviderKind::CustomFunction
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<(TypeId, TypeId, Variant), RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the program's free functions and the given interfaces.
    ///
    /// An empty `allowlist` admits every exported conversion function.
    pub fn build(program: &Program, allowlist: &[String], interfaces: &[&InterfaceDecl]) -> Self {
        let mut registry = Self::new();
        registry.register_functions(program, allowlist);
        for iface in interfaces {
            registry.register_methods(program, iface);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, src: TypeId, dst: TypeId, variant: Variant) -> Option<&RegistryEntry> {
        self.entries.get(&(src, dst, variant))
    }

    /// Free function converting `src` into `dst`. With `allow_fallible`
    /// the fallible slot is checked first.
    pub fn custom_function(&self, src: TypeId, dst: TypeId, allow_fallible: bool) -> Option<&RegistryEntry> {
        let fallible = if allow_fallible {
            self.lookup(src, dst, Variant::Fallible)
        } else {
            None
        };
        fallible
            .or_else(|| self.lookup(src, dst, Variant::Plain))
            .filter(|e| e.is_custom_function())
    }

    fn insert(&mut self, key: (TypeId, TypeId, Variant), entry: RegistryEntry) {
        if let Some(existing) = self.entries.get(&key) {
            log::debug!(
                "registry: {} ignored, {} already converts this pair",
                entry.provider,
                existing.provider
            );
            return;
        }
        self.entries.insert(key, entry);
    }

    pub fn register_functions(&mut self, program: &Program, allowlist: &[String]) {
        for name in allowlist {
            if program.function(name).is_none() {
                log::warn!("custom function {name} not found");
            }
        }

        let mut functions: Vec<&FuncDecl> = program
            .functions
            .iter()
            .filter(|f| f.is_exported())
            .filter(|f| allowlist.is_empty() || allowlist.contains(&f.name))
            .collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        for func in functions {
            if !func.is_conversion(&program.types) {
                if !allowlist.is_empty() {
                    log::warn!("custom function {} is not a conversion function", func.name);
                }
                continue;
            }
            let returns_failure = func.returns_failure(&program.types);
            let variant = if returns_failure {
                Variant::Fallible
            } else {
                Variant::Plain
            };
            log::debug!("registry: function {} ({:?})", func.name, variant);
            self.insert(
                (func.params[0].ty, func.results[0], variant),
                RegistryEntry {
                    provider: func.name.clone(),
                    returns_failure,
                    kind: ProviderKind::CustomFunction,
                },
            );
        }
    }

    /// Back-fill single-source methods of `iface`.
    pub fn register_methods(&mut self, program: &Program, iface: &InterfaceDecl) {
        let types = &program.types;
        for method in &iface.methods {
            let sources: Vec<TypeId> = method
                .params
                .iter()
                .map(|p| p.ty)
                .filter(|ty| !types.is_context(*ty))
                .collect();
            let valid_results = match method.results.as_slice() {
                [_] => true,
                [_, err] => types.is_error(*err),
                _ => false,
            };
            let [src] = sources.as_slice() else {
                continue;
            };
            if !valid_results {
                continue;
            }
            let dst = method.results[0];
            if self.lookup(*src, dst, Variant::Plain).is_some()
                || self.lookup(*src, dst, Variant::Fallible).is_some()
            {
                continue;
            }
            self.insert(
                (*src, dst, Variant::Plain),
                RegistryEntry {
                    provider: method.name.clone(),
                    returns_failure: method.results.len() == 2,
                    kind: ProviderKind::InterfaceMethod {
                        interface: iface.name.clone(),
                    },
                },
            );
        }
    }
}
