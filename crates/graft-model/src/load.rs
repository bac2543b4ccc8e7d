// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON model files.
//!
//! A model file declares the types, free functions and interfaces of one
//! package. Named types are declared before any definition is read, so
//! declarations may refer to each other in any order (including cycles).

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ModelError;
use crate::parse_type::parse_type_expr;
use crate::program::{FuncDecl, InterfaceDecl, Param, Program};
use crate::table::TypeTable;
use crate::types::Field;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    package: String,
    #[serde(default)]
    types: Vec<TypeSpec>,
    #[serde(default)]
    functions: Vec<FuncSpec>,
    #[serde(default)]
    interfaces: Vec<InterfaceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSpec {
    name: String,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    fields: Option<Vec<FieldSpec>>,
    #[serde(default)]
    underlying: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FuncSpec {
    name: String,
    #[serde(default)]
    params: Vec<ParamSpec>,
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InterfaceSpec {
    name: String,
    #[serde(default)]
    methods: Vec<FuncSpec>,
}

/// Parse a model from JSON text.
pub fn from_json(json: &str) -> Result<Program, ModelError> {
    let file: ModelFile = serde_json::from_str(json)?;
    build(file)
}

/// Read and parse a model file.
pub fn from_path(path: &Path) -> Result<Program, ModelError> {
    let text = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    from_json(&text)
}

fn build(file: ModelFile) -> Result<Program, ModelError> {
    let mut types = TypeTable::new();

    let mut declared = Vec::with_capacity(file.types.len());
    for spec in &file.types {
        let id = types.declare_named(&spec.name, spec.package.as_deref())?;
        declared.push(id);
    }
    let mut iface_ids = Vec::with_capacity(file.interfaces.len());
    for spec in &file.interfaces {
        iface_ids.push(types.declare_named(&spec.name, None)?);
    }

    for (spec, id) in file.types.iter().zip(declared) {
        let definition = match (&spec.fields, &spec.underlying) {
            (Some(fields), None) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    let context = format!("field {}.{}", spec.name, field.name);
                    let ty = parse_type_expr(&field.ty, &mut types, &context)?;
                    out.push(Field {
                        name: field.name.clone(),
                        ty,
                        tag: field.tag.clone(),
                    });
                }
                types.record(out)
            }
            (None, Some(underlying)) => {
                let context = format!("type {}", spec.name);
                parse_type_expr(underlying, &mut types, &context)?
            }
            _ => return Err(ModelError::AmbiguousDefinition(spec.name.clone())),
        };
        types.define_named(id, definition)?;
    }
    let opaque = types.interface();
    for id in iface_ids {
        types.define_named(id, opaque)?;
    }

    let mut seen = HashSet::new();
    let mut functions = Vec::with_capacity(file.functions.len());
    for spec in &file.functions {
        if !seen.insert(spec.name.clone()) {
            return Err(ModelError::Duplicate(spec.name.clone()));
        }
        functions.push(build_func(spec, &mut types, &format!("function {}", spec.name))?);
    }

    let mut interfaces = Vec::with_capacity(file.interfaces.len());
    for spec in &file.interfaces {
        let mut methods = Vec::with_capacity(spec.methods.len());
        let mut names = HashSet::new();
        for method in &spec.methods {
            if !names.insert(method.name.clone()) {
                return Err(ModelError::Duplicate(format!("{}.{}", spec.name, method.name)));
            }
            let context = format!("method {}.{}", spec.name, method.name);
            methods.push(build_func(method, &mut types, &context)?);
        }
        interfaces.push(InterfaceDecl {
            name: spec.name.clone(),
            methods,
        });
    }

    Ok(Program {
        package: file.package,
        types,
        functions,
        interfaces,
    })
}

fn build_func(spec: &FuncSpec, types: &mut TypeTable, context: &str) -> Result<FuncDecl, ModelError> {
    let mut params = Vec::with_capacity(spec.params.len());
    for param in &spec.params {
        let ty = parse_type_expr(&param.ty, types, context)?;
        params.push(Param::new(param.name.as_deref(), ty));
    }
    let mut results = Vec::with_capacity(spec.results.len());
    for result in &spec.results {
        results.push(parse_type_expr(result, types, context)?);
    }
    Ok(FuncDecl {
        name: spec.name.clone(),
        params,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shape;

    #[test]
    fn loads_recursive_declarations() {
        let json = r#"{
            "package": "recursive",
            "types": [
                { "name": "A", "fields": [
                    { "name": "Text", "type": "string" },
                    { "name": "B", "type": "*B" } ] },
                { "name": "B", "fields": [
                    { "name": "Text", "type": "string" },
                    { "name": "A", "type": "*A" } ] }
            ],
            "interfaces": [
                { "name": "Mapper", "methods": [
                    { "name": "AToB", "params": [ { "type": "A" } ], "results": ["B"] } ] }
            ]
        }"#;
        let program = from_json(json).unwrap();
        let a = program.types.lookup("A").unwrap();
        let b = program.types.lookup("B").unwrap();
        let b_field = program.types.field(a, "B").unwrap();
        assert_eq!(program.types.shape(b_field.ty), Shape::Optional(b));

        let mapper = program.interface("Mapper").unwrap();
        let method = mapper.method("AToB").unwrap();
        assert_eq!(method.params[0].name, None);
        assert_eq!(method.results, vec![b]);
    }

    #[test]
    fn keeps_field_tags() {
        let json = r#"{
            "package": "tags",
            "types": [ { "name": "Out", "fields": [
                { "name": "UserName", "type": "string", "tag": "mapsrc:\"P.Name\"" } ] } ]
        }"#;
        let program = from_json(json).unwrap();
        let out = program.types.lookup("Out").unwrap();
        assert_eq!(
            program.types.fields(out)[0].tag.as_deref(),
            Some("mapsrc:\"P.Name\"")
        );
    }

    #[test]
    fn interfaces_are_declared_types() {
        let json = r#"{
            "package": "p",
            "interfaces": [ { "name": "M", "methods": [] } ]
        }"#;
        let program = from_json(json).unwrap();
        let m = program.types.lookup("M").unwrap();
        assert_eq!(program.types.shape(m), Shape::Opaque);
    }

    #[test]
    fn failure_signatures_are_recognized() {
        let json = r#"{
            "package": "p",
            "types": [ { "name": "A", "fields": [] }, { "name": "B", "fields": [] } ],
            "functions": [
                { "name": "AToB", "params": [ { "type": "A" } ], "results": ["B", "error"] },
                { "name": "Pair", "params": [ { "type": "A" } ], "results": ["B", "A"] }
            ]
        }"#;
        let program = from_json(json).unwrap();
        let ok = program.function("AToB").unwrap();
        assert!(ok.is_conversion(&program.types));
        assert!(ok.returns_failure(&program.types));
        let bad = program.function("Pair").unwrap();
        assert!(!bad.is_conversion(&program.types));
    }

    #[test]
    fn rejects_type_with_fields_and_underlying() {
        let json = r#"{
            "package": "p",
            "types": [ { "name": "A", "fields": [], "underlying": "int" } ]
        }"#;
        assert!(matches!(
            from_json(json),
            Err(ModelError::AmbiguousDefinition(name)) if name == "A"
        ));
    }

    #[test]
    fn rejects_duplicate_functions() {
        let json = r#"{
            "package": "p",
            "types": [ { "name": "A", "fields": [] } ],
            "functions": [
                { "name": "F", "params": [ { "type": "A" } ], "results": ["A"] },
                { "name": "F", "params": [ { "type": "A" } ], "results": ["A"] }
            ]
        }"#;
        assert!(matches!(from_json(json), Err(ModelError::Duplicate(_))));
    }

    #[test]
    fn reports_json_errors() {
        assert!(matches!(from_json("{"), Err(ModelError::Json(_))));
        assert!(matches!(
            from_json(r#"{ "package": "p", "bogus": 1 }"#),
            Err(ModelError::Json(_))
        ));
    }
}
