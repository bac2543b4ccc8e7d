// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Synthesized helper functions.
//!
//! Helpers are planned in two phases. Reserving a helper assigns its name
//! and records its signature before any body exists, so a recursive type
//! pair that reaches itself again finds the reservation and emits a call
//! instead of recursing. Bodies are filled in later by
//! [`PlanSession::populate_helpers`], which keeps going until helpers
//! reserved during population are populated as well.

use std::collections::HashMap;

use graft_model::TypeId;
use sha1::{Digest, Sha1};

use crate::fields::{FieldScope, SourceParam};
use crate::ir::{Expr, Node};
use crate::registry::RegistryEntry;
use crate::session::{PlanSession, Site};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    /// Field-by-field record conversion.
    Record,
    /// Conversion of a top-level collection.
    Collection,
}

#[derive(Debug, Clone)]
pub struct HelperPlan {
    pub name: String,
    pub kind: HelperKind,
    pub source: TypeId,
    pub dest: TypeId,
    pub source_is_optional: bool,
    pub dest_is_optional: bool,
    /// Returned when the source is nil.
    pub zero_value: Expr,
    /// Returned alongside a failure.
    pub failure_value: Expr,
    /// Free function the helper delegates to.
    pub provider: Option<RegistryEntry>,
    pub populated: bool,
    pub fallible: bool,
    pub has_context: bool,
    pub body: Vec<Node>,
}

impl HelperPlan {
    pub fn is_top_level_collection(&self) -> bool {
        self.kind == HelperKind::Collection
    }
}

/// Memo table of helpers, in reservation order.
#[derive(Debug, Default)]
pub struct HelperTable {
    plans: Vec<HelperPlan>,
    by_key: HashMap<String, usize>,
}

impl HelperTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn plan(&self, index: usize) -> &HelperPlan {
        &self.plans[index]
    }

    pub fn plans(&self) -> &[HelperPlan] {
        &self.plans
    }

    pub fn into_plans(self) -> Vec<HelperPlan> {
        self.plans
    }

    /// Return the helper registered under `key`, reserving it with `build`
    /// on first use.
    pub fn reserve_with(&mut self, key: String, build: impl FnOnce(String) -> HelperPlan) -> String {
        if let Some(&index) = self.by_key.get(&key) {
            return self.plans[index].name.clone();
        }
        let plan = build(helper_name(&key));
        log::debug!("reserved helper {} for {}", plan.name, key);
        let name = plan.name.clone();
        self.by_key.insert(key, self.plans.len());
        self.plans.push(plan);
        name
    }

    /// Attach the body of a reserved helper. Each helper is populated once.
    pub fn populate(&mut self, index: usize, body: Vec<Node>) {
        let plan = &mut self.plans[index];
        debug_assert!(!plan.populated, "helper {} populated twice", plan.name);
        plan.body = body;
        plan.populated = true;
    }
}

/// `map_` followed by the first six bytes of the key's SHA-1, in hex.
pub fn helper_name(key: &str) -> String {
    let digest = Sha1::digest(key.as_bytes());
    let mut name = String::from("map_");
    for byte in &digest[..6] {
        name.push_str(&format!("{byte:02x}"));
    }
    name
}

impl PlanSession<'_> {
    pub(crate) fn ensure_struct_helper(&mut self, src: TypeId, dst: TypeId) -> String {
        let program = self.program;
        let key = format!("{}->{}", program.type_name(src), program.type_name(dst));
        let registry = &self.registry;
        let has_context = self.needs_context;
        self.helpers.reserve_with(key, |name| {
            let types = &program.types;
            let dest_is_optional = types.optional_record(dst).is_some();
            let (zero_value, failure_value) = if dest_is_optional {
                (Expr::Nil, Expr::var("mapped").addr_of())
            } else {
                (Expr::Zero(dst), Expr::var("dst"))
            };
            HelperPlan {
                name,
                kind: HelperKind::Record,
                source: src,
                dest: dst,
                source_is_optional: types.optional_record(src).is_some(),
                dest_is_optional,
                zero_value,
                failure_value,
                provider: registry.custom_function(src, dst, true).cloned(),
                populated: false,
                fallible: false,
                has_context,
                body: Vec::new(),
            }
        })
    }

    pub(crate) fn ensure_collection_helper(&mut self, src: TypeId, dst: TypeId) -> String {
        let program = self.program;
        let key = format!("comp:{}->{}", program.type_name(src), program.type_name(dst));
        let has_context = self.needs_context;
        self.helpers.reserve_with(key, |name| HelperPlan {
            name,
            kind: HelperKind::Collection,
            source: src,
            dest: dst,
            source_is_optional: false,
            dest_is_optional: false,
            zero_value: Expr::Zero(dst),
            failure_value: Expr::var("dst"),
            provider: None,
            populated: false,
            fallible: false,
            has_context,
            body: Vec::new(),
        })
    }

    /// Populate reserved helpers until no unpopulated helper remains.
    pub(crate) fn populate_helpers(&mut self) {
        let mut index = 0;
        while index < self.helpers.len() {
            if !self.helpers.plan(index).populated {
                let body = self.build_helper_body(index);
                self.helpers.populate(index, body);
            }
            index += 1;
        }
    }

    fn build_helper_body(&mut self, index: usize) -> Vec<Node> {
        let plan = self.helpers.plan(index);
        log::debug!("populating helper {}", plan.name);
        let kind = plan.kind;
        let (source, dest) = (plan.source, plan.dest);
        let (source_is_optional, dest_is_optional) = (plan.source_is_optional, plan.dest_is_optional);
        let zero_value = plan.zero_value.clone();
        let provider = plan.provider.clone();
        let site = Site::helper(self.helper_ctx());

        let ret = |value| Node::Return {
            value,
            may_fail: false,
            forwards_failure: false,
        };

        if kind == HelperKind::Collection {
            let mut body = vec![Node::DestInit {
                var: "dst".to_string(),
                ty: dest,
            }];
            body.extend(self.resolve(Expr::var("dst"), Expr::var("in"), dest, source, &site));
            body.push(ret(Expr::var("dst")));
            return body;
        }

        if let Some(provider) = provider {
            return vec![
                Node::DestInit {
                    var: "dst".to_string(),
                    ty: dest,
                },
                Node::CallCustomFunction {
                    dest: Expr::var("dst"),
                    function: provider.provider,
                    arg: Expr::var("in"),
                    may_fail: provider.returns_failure,
                },
                ret(Expr::var("dst")),
            ];
        }

        let types = self.types();
        if source_is_optional || dest_is_optional {
            let mut body = Vec::new();
            let (src_record, arg) = match types.optional_record(source) {
                Some(payload) if source_is_optional => {
                    body.push(Node::GuardEarlyReturnIfNull {
                        var: "in".to_string(),
                        zero: zero_value,
                        may_fail: false,
                    });
                    (payload, Expr::var("in").deref())
                }
                _ => (source, Expr::var("in")),
            };
            let (dst_record, dst_var, value) = match types.optional_record(dest) {
                Some(payload) if dest_is_optional => (payload, "mapped", Expr::var("mapped").addr_of()),
                _ => (dest, "dst", Expr::var("dst")),
            };
            // the record pair owns the field body; this helper only unwraps
            let inner = self.ensure_struct_helper(src_record, dst_record);
            body.push(Node::DestInit {
                var: dst_var.to_string(),
                ty: dst_record,
            });
            body.push(Node::CallHelper {
                dest: Expr::var(dst_var),
                helper: inner,
                arg,
                ctx: site.ctx.clone(),
                may_fail: false,
            });
            body.push(ret(value));
            return body;
        }

        let mut body = vec![Node::DestInit {
            var: "dst".to_string(),
            ty: dest,
        }];
        let sources = [SourceParam {
            declared_name: None,
            position: 0,
            value: Expr::var("in"),
            value_type: source,
            record: Some((Expr::var("in"), source)),
        }];
        let scope = FieldScope {
            dest: Expr::var("dst"),
            sources: &sources,
            primary: 0,
            selectors: false,
            site: &site,
        };
        body.extend(self.resolve_fields(dest, &scope));
        body.push(ret(Expr::var("dst")));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(name: String) -> HelperPlan {
        HelperPlan {
            name,
            kind: HelperKind::Record,
            source: TypeId(1),
            dest: TypeId(2),
            source_is_optional: false,
            dest_is_optional: false,
            zero_value: Expr::Zero(TypeId(2)),
            failure_value: Expr::var("dst"),
            provider: None,
            populated: false,
            fallible: false,
            has_context: false,
            body: Vec::new(),
        }
    }

    #[test]
    fn names_are_stable_hashes() {
        let a = helper_name("User->UserDTO");
        assert_eq!(a, helper_name("User->UserDTO"));
        assert_ne!(a, helper_name("UserDTO->User"));
        assert!(a.starts_with("map_"));
        assert_eq!(a.len(), 4 + 12);
        assert!(a[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reserve_is_idempotent() {
        let mut table = HelperTable::new();
        let first = table.reserve_with("A->B".into(), plan);
        let second = table.reserve_with("A->B".into(), |_| panic!("must not rebuild"));
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);

        table.reserve_with("comp:A->B".into(), plan);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn populate_marks_plan() {
        let mut table = HelperTable::new();
        table.reserve_with("A->B".into(), plan);
        assert!(!table.plan(0).populated);
        table.populate(0, vec![Node::DestInit { var: "dst".into(), ty: TypeId(2) }]);
        assert!(table.plan(0).populated);
        assert_eq!(table.plan(0).body.len(), 1);
    }
}
