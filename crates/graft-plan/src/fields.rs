// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Field resolution for record destinations.
//!
//! Each exported destination field is matched against the available
//! sources in this order: `mapsrc` path, `mapfn` conversion function,
//! exact name on the selected source, `map` alias on a source field,
//! the destination's own `map` alias, exact name on the other sources,
//! a whole source whose type is the field type. Fields that match nothing
//! are reported and left at their zero value.

use graft_model::{Field, Shape, TypeId, TypeTable};

use crate::ir::{Expr, LoopVars, Node};
use crate::session::{PlanSession, Site};

const ALIAS_KEY: &str = "map";
const PATH_KEY: &str = "mapsrc";
const FUNCTION_KEY: &str = "mapfn";

/// Mapping annotations of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    /// `map`: the name of the field on the other side.
    pub alias: Option<String>,
    /// `mapsrc`: dotted source path.
    pub source_path: Option<String>,
    /// `mapfn`: conversion function name.
    pub function: Option<String>,
}

impl Annotations {
    pub fn parse(tag: Option<&str>) -> Self {
        let mut out = Self::default();
        for (key, value) in parse_tag(tag.unwrap_or_default()) {
            let slot = match key.as_str() {
                ALIAS_KEY => &mut out.alias,
                PATH_KEY => &mut out.source_path,
                FUNCTION_KEY => &mut out.function,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value);
            }
        }
        out
    }
}

/// Split a struct tag into `key:"value"` pairs.
///
/// Parsing stops at the first malformed pair.
pub fn parse_tag(tag: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = tag;
    loop {
        rest = rest.trim_start();
        let Some(colon) = rest.find(':') else {
            break;
        };
        let key = &rest[..colon];
        if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '"') {
            break;
        }
        let Some(quoted) = rest[colon + 1..].strip_prefix('"') else {
            break;
        };
        let mut value = String::new();
        let mut chars = quoted.char_indices();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => value.push(c),
            }
        }
        let Some(end) = end else {
            break;
        };
        pairs.push((key.to_string(), value));
        rest = &quoted[end + 1..];
    }
    pairs
}

/// A value fields can be read from: a method parameter or a helper's input.
#[derive(Debug, Clone)]
pub(crate) struct SourceParam {
    /// Name as declared; synthesized names never match selectors.
    pub declared_name: Option<String>,
    /// Index among the non-context parameters.
    pub position: usize,
    pub value: Expr,
    pub value_type: TypeId,
    /// Record reachable for field access and the expression reading it.
    pub record: Option<(Expr, TypeId)>,
}

impl SourceParam {
    fn field(&self, types: &TypeTable, name: &str) -> Option<(Expr, TypeId)> {
        let (base, record) = self.record.as_ref()?;
        let field = types.field(*record, name).filter(|f| f.is_exported())?;
        Some((base.clone().field(name), field.ty))
    }

    /// Exported source field carrying a `map` alias equal to `dest_name`.
    fn aliased_field(&self, types: &TypeTable, dest_name: &str) -> Option<(Expr, TypeId)> {
        let (base, record) = self.record.as_ref()?;
        types
            .fields(*record)
            .iter()
            .filter(|f| f.is_exported())
            .find(|f| {
                Annotations::parse(f.tag.as_deref())
                    .alias
                    .is_some_and(|alias| alias.eq_ignore_ascii_case(dest_name))
            })
            .map(|f| (base.clone().field(&f.name), f.ty))
    }
}

pub(crate) struct FieldScope<'s> {
    pub dest: Expr,
    pub sources: &'s [SourceParam],
    /// Source consulted first.
    pub primary: usize,
    /// Whether `mapsrc` paths may start with a parameter selector.
    pub selectors: bool,
    pub site: &'s Site,
}

impl PlanSession<'_> {
    pub(crate) fn resolve_fields(&mut self, dest_record: TypeId, scope: &FieldScope<'_>) -> Vec<Node> {
        let types = self.types();
        let mut nodes = Vec::new();
        for field in types.fields(dest_record) {
            if !field.is_exported() {
                continue;
            }
            nodes.extend(self.resolve_field(field, scope));
        }
        nodes
    }

    fn resolve_field(&mut self, field: &Field, scope: &FieldScope<'_>) -> Vec<Node> {
        let types = self.types();
        let ann = Annotations::parse(field.tag.as_deref());
        let dest = scope.dest.clone().field(&field.name);
        let site = scope.site;

        if let (Some(function), Some(path)) = (&ann.function, &ann.source_path) {
            return vec![unresolved(
                field,
                format!("mapfn \"{function}\" cannot be combined with mapsrc \"{path}\""),
            )];
        }

        let mut selected = scope.primary;
        let mut lookup = field.name.clone();

        if let Some(path) = &ann.source_path {
            let segments: Vec<&str> = path.split('.').map(str::trim).collect();
            let (source, rest) = match select_param(scope, segments[0]) {
                Some(index) => (index, &segments[1..]),
                None => (selected, &segments[..]),
            };
            if let Some((expr, ty)) = walk_path(types, &scope.sources[source], rest) {
                return self.resolve(dest, expr, field.ty, ty, site);
            }
            log::debug!("mapsrc path {path} not found for {}", field.name);
            selected = source;
            if let Some(last) = rest.last() {
                lookup = (*last).to_string();
            }
        }

        if let Some(function) = &ann.function {
            return self.resolve_with_function(field, dest, function, &scope.sources[selected], &lookup, &ann);
        }

        if let Some((expr, ty)) = find_source_field(types, &scope.sources[selected], &lookup, field, &ann) {
            return self.resolve(dest, expr, field.ty, ty, site);
        }

        for (index, source) in scope.sources.iter().enumerate() {
            if index == selected {
                continue;
            }
            if let Some((expr, ty)) = source.field(types, &field.name) {
                return self.resolve(dest, expr, field.ty, ty, site);
            }
        }

        if let Some(source) = scope
            .sources
            .iter()
            .find(|s| types.identical(s.value_type, field.ty))
        {
            return vec![Node::AssignDirect {
                dest,
                src: source.value.clone(),
            }];
        }

        log::debug!("no source for field {}", field.name);
        vec![unresolved(field, format!("no source for {}", field.name))]
    }

    fn resolve_with_function(
        &mut self,
        field: &Field,
        dest: Expr,
        function: &str,
        source: &SourceParam,
        lookup: &str,
        ann: &Annotations,
    ) -> Vec<Node> {
        let program = self.program;
        let types = &program.types;
        let Some(decl) = program.function(function).filter(|f| f.is_conversion(types)) else {
            return vec![unresolved(field, format!("mapfn {function} not found or invalid"))];
        };
        let Some((src, src_ty)) = find_source_field(types, source, lookup, field, ann) else {
            return vec![unresolved(
                field,
                format!("no source field for {} (mapfn {function})", field.name),
            )];
        };

        let may_fail = decl.returns_failure(types);
        let per_element = !types.shape(decl.params[0].ty).is_collection();
        let call = |vars: &LoopVars| Node::CallCustomFunction {
            dest: Expr::var(&vars.mapped),
            function: function.to_string(),
            arg: Expr::var(&vars.elem),
            may_fail,
        };

        match (types.shape(field.ty), types.shape(src_ty)) {
            (Shape::Sequence(elem), Shape::Sequence(_)) if per_element => {
                let vars = self.fresh_loop_vars();
                vec![Node::MapSequence {
                    dest,
                    src,
                    dest_type: field.ty,
                    elem_type: elem,
                    body: vec![call(&vars)],
                    vars,
                    fixed_len: None,
                    may_fail,
                }]
            }
            (Shape::Array { elem, len }, Shape::Array { len: src_len, .. })
                if per_element && len == src_len =>
            {
                let vars = self.fresh_loop_vars();
                vec![Node::MapSequence {
                    dest,
                    src,
                    dest_type: field.ty,
                    elem_type: elem,
                    body: vec![call(&vars)],
                    vars,
                    fixed_len: Some(len),
                    may_fail,
                }]
            }
            (Shape::Map { key, value }, Shape::Map { key: src_key, .. })
                if per_element && types.identical(key, src_key) =>
            {
                let vars = self.fresh_loop_vars();
                vec![Node::MapAssociative {
                    dest,
                    src,
                    dest_type: field.ty,
                    value_type: value,
                    body: vec![call(&vars)],
                    vars,
                    may_fail,
                }]
            }
            _ => vec![Node::CallCustomFunction {
                dest,
                function: function.to_string(),
                arg: src,
                may_fail,
            }],
        }
    }
}

/// Name-based lookup on one source: exact name, then a source field whose
/// alias names the destination field, then the destination's own alias.
fn find_source_field(
    types: &TypeTable,
    source: &SourceParam,
    lookup: &str,
    dest_field: &Field,
    ann: &Annotations,
) -> Option<(Expr, TypeId)> {
    if let Some(found) = source.field(types, lookup) {
        return Some(found);
    }
    if let Some(found) = source.aliased_field(types, &dest_field.name) {
        return Some(found);
    }
    let alias = ann.alias.as_deref()?;
    source
        .field(types, alias)
        .or_else(|| source.field(types, &capitalize(alias)))
}

/// Parameter named by the first `mapsrc` segment.
///
/// Declared names win; `pN` selects the N-th non-context parameter when no
/// parameter is declared under that name.
fn select_param(scope: &FieldScope<'_>, token: &str) -> Option<usize> {
    if !scope.selectors {
        return None;
    }
    select_source(scope.sources, token)
}

fn select_source(sources: &[SourceParam], token: &str) -> Option<usize> {
    if let Some(index) = sources
        .iter()
        .position(|s| s.declared_name.as_deref() == Some(token))
    {
        return Some(index);
    }
    let digits = token.strip_prefix('p')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let position: usize = digits.parse().ok()?;
    sources.iter().position(|s| s.position == position)
}

/// Whether any exported field of `dest_record` has a `mapsrc` path whose
/// first segment names one of `sources`.
pub(crate) fn selects_source(types: &TypeTable, dest_record: TypeId, sources: &[SourceParam]) -> bool {
    types.fields(dest_record).iter().filter(|f| f.is_exported()).any(|field| {
        Annotations::parse(field.tag.as_deref())
            .source_path
            .as_deref()
            .and_then(|path| path.split('.').next())
            .is_some_and(|first| select_source(sources, first.trim()).is_some())
    })
}

/// Follow exported record fields from `source`. An empty path is the whole
/// source.
fn walk_path(types: &TypeTable, source: &SourceParam, segments: &[&str]) -> Option<(Expr, TypeId)> {
    let Some((first, rest)) = segments.split_first() else {
        return Some((source.value.clone(), source.value_type));
    };
    let (mut expr, mut ty) = source.field(types, first)?;
    for segment in rest {
        if let Some(payload) = types.optional_record(ty) {
            expr = expr.deref();
            ty = payload;
        }
        if !types.is_record_like(ty) {
            return None;
        }
        let field = types.field(ty, segment).filter(|f| f.is_exported())?;
        expr = expr.field(*segment);
        ty = field.ty;
    }
    Some((expr, ty))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn unresolved(field: &Field, reason: String) -> Node {
    Node::FieldUnresolved {
        field: field.name.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_struct_tags() {
        let pairs = parse_tag(r#"json:"name,omitempty" mapsrc:"P.Name"  map:"label""#);
        assert_eq!(
            pairs,
            vec![
                ("json".to_string(), "name,omitempty".to_string()),
                ("mapsrc".to_string(), "P.Name".to_string()),
                ("map".to_string(), "label".to_string()),
            ]
        );
    }

    #[test]
    fn tag_parsing_handles_escapes_and_garbage() {
        assert_eq!(
            parse_tag(r#"a:"x\"y""#),
            vec![("a".to_string(), "x\"y".to_string())]
        );
        assert_eq!(parse_tag(r#"a:"ok" broken"#).len(), 1);
        assert!(parse_tag(r#"a:unquoted"#).is_empty());
        assert!(parse_tag("").is_empty());
    }

    #[test]
    fn annotations_ignore_unknown_keys() {
        let ann = Annotations::parse(Some(r#"json:"x" mapfn:"Conv" map:"Other""#));
        assert_eq!(ann.function.as_deref(), Some("Conv"));
        assert_eq!(ann.alias.as_deref(), Some("Other"));
        assert_eq!(ann.source_path, None);
        assert_eq!(Annotations::parse(None), Annotations::default());
    }

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(capitalize("name"), "Name");
        assert_eq!(capitalize(""), "");
    }

    fn param(name: Option<&str>, position: usize) -> SourceParam {
        SourceParam {
            declared_name: name.map(str::to_string),
            position,
            value: Expr::var(name.unwrap_or("p")),
            value_type: TypeId(0),
            record: None,
        }
    }

    #[test]
    fn declared_names_win_over_positions() {
        let site = Site::default();
        // second parameter is literally named p0
        let sources = [param(Some("a"), 0), param(Some("p0"), 1)];
        let scope = FieldScope {
            dest: Expr::var("dst"),
            sources: &sources,
            primary: 0,
            selectors: true,
            site: &site,
        };
        assert_eq!(select_param(&scope, "p0"), Some(1));
        assert_eq!(select_param(&scope, "p1"), Some(1));
        assert_eq!(select_param(&scope, "a"), Some(0));
        assert_eq!(select_param(&scope, "p"), None);
        assert_eq!(select_param(&scope, "P"), None);
    }

    #[test]
    fn positions_count_non_context_parameters() {
        let site = Site::default();
        let sources = [param(None, 0), param(None, 1)];
        let scope = FieldScope {
            dest: Expr::var("dst"),
            sources: &sources,
            primary: 0,
            selectors: true,
            site: &site,
        };
        assert_eq!(select_param(&scope, "p1"), Some(1));
        assert_eq!(select_param(&scope, "p2"), None);

        let helper_scope = FieldScope {
            selectors: false,
            ..scope
        };
        assert_eq!(select_param(&helper_scope, "p0"), None);
    }
}
