// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Assignment resolution: pick the conversion strategy for one
//! `(dest, source)` type pair.
//!
//! Strategies are tried in a fixed order and the first match wins:
//! identity, plain conversion, registered provider, sequence, fixed array,
//! map, pointer-to-record, record, and finally unsupported.

use graft_model::{Shape, TypeId};

use crate::ir::{body_may_fail, Expr, Node};
use crate::registry::{ProviderKind, RegistryEntry, Variant};
use crate::session::{PlanSession, Site};

impl PlanSession<'_> {
    pub(crate) fn resolve(
        &mut self,
        dest: Expr,
        src: Expr,
        dest_ty: TypeId,
        src_ty: TypeId,
        site: &Site,
    ) -> Vec<Node> {
        let types = self.types();

        if types.identical(src_ty, dest_ty) {
            return vec![Node::AssignDirect { dest, src }];
        }
        if types.assignable(src_ty, dest_ty) {
            return vec![Node::AssignCast {
                dest,
                src,
                ty: dest_ty,
            }];
        }
        if let Some(entry) = self.usable_provider(src_ty, dest_ty, site) {
            return vec![provider_call(&entry, dest, src, site)];
        }

        match (types.shape(dest_ty), types.shape(src_ty)) {
            (Shape::Sequence(dest_elem), Shape::Sequence(src_elem)) => {
                vec![self.map_sequence(dest, src, dest_ty, dest_elem, src_elem, None, site)]
            }
            (
                Shape::Array {
                    elem: dest_elem,
                    len: dest_len,
                },
                Shape::Array {
                    elem: src_elem,
                    len: src_len,
                },
            ) if dest_len == src_len => vec![self.map_sequence(
                dest,
                src,
                dest_ty,
                dest_elem,
                src_elem,
                Some(dest_len),
                site,
            )],
            (
                Shape::Map {
                    key: dest_key,
                    value: dest_value,
                },
                Shape::Map {
                    key: src_key,
                    value: src_value,
                },
            ) if types.identical(dest_key, src_key) => {
                vec![self.map_associative(dest, src, dest_ty, dest_value, src_value, site)]
            }
            (Shape::Optional(dest_payload), Shape::Optional(src_payload))
                if types.is_record_like(dest_payload) && types.is_record_like(src_payload) =>
            {
                vec![self.map_optional(dest, src, dest_payload, src_payload, site)]
            }
            (Shape::Record, Shape::Record) => {
                let helper = self.ensure_struct_helper(src_ty, dest_ty);
                vec![Node::CallHelper {
                    dest,
                    helper,
                    arg: src,
                    ctx: site.ctx.clone(),
                    may_fail: false,
                }]
            }
            _ => {
                log::debug!(
                    "no strategy for {} -> {}",
                    self.type_name(src_ty),
                    self.type_name(dest_ty)
                );
                vec![Node::Unsupported {
                    dest,
                    src_type: src_ty,
                    dest_type: dest_ty,
                }]
            }
        }
    }

    /// Plain provider for the pair, if this site may call it.
    ///
    /// Free functions are always callable. Interface methods are only
    /// reachable from other methods of the same interface.
    fn usable_provider(&self, src: TypeId, dst: TypeId, site: &Site) -> Option<RegistryEntry> {
        let entry = self.registry.lookup(src, dst, Variant::Plain)?;
        let usable = match &entry.kind {
            ProviderKind::CustomFunction => true,
            ProviderKind::InterfaceMethod { interface } => {
                site.interface.as_deref() == Some(interface.as_str())
                    && site.method.as_deref() != Some(entry.provider.as_str())
            }
        };
        usable.then(|| entry.clone())
    }

    #[allow(clippy::too_many_arguments)]
    fn map_sequence(
        &mut self,
        dest: Expr,
        src: Expr,
        dest_ty: TypeId,
        dest_elem: TypeId,
        src_elem: TypeId,
        fixed_len: Option<usize>,
        site: &Site,
    ) -> Node {
        let vars = self.fresh_loop_vars();
        let body = self.resolve(
            Expr::var(&vars.mapped),
            Expr::var(&vars.elem),
            dest_elem,
            src_elem,
            site,
        );
        let may_fail = body_may_fail(&body);
        Node::MapSequence {
            dest,
            src,
            dest_type: dest_ty,
            elem_type: dest_elem,
            vars,
            fixed_len,
            body,
            may_fail,
        }
    }

    fn map_associative(
        &mut self,
        dest: Expr,
        src: Expr,
        dest_ty: TypeId,
        dest_value: TypeId,
        src_value: TypeId,
        site: &Site,
    ) -> Node {
        let vars = self.fresh_loop_vars();
        let body = self.resolve(
            Expr::var(&vars.mapped),
            Expr::var(&vars.elem),
            dest_value,
            src_value,
            site,
        );
        let may_fail = body_may_fail(&body);
        Node::MapAssociative {
            dest,
            src,
            dest_type: dest_ty,
            value_type: dest_value,
            vars,
            body,
            may_fail,
        }
    }

    fn map_optional(
        &mut self,
        dest: Expr,
        src: Expr,
        dest_payload: TypeId,
        src_payload: TypeId,
        site: &Site,
    ) -> Node {
        let temp = self.fresh_temp();
        let inner = src.clone().deref();
        let body = match self.usable_provider(src_payload, dest_payload, site) {
            Some(entry) => vec![provider_call(&entry, Expr::var(&temp), inner, site)],
            None => {
                let helper = self.ensure_struct_helper(src_payload, dest_payload);
                vec![Node::CallHelper {
                    dest: Expr::var(&temp),
                    helper,
                    arg: inner,
                    ctx: site.ctx.clone(),
                    may_fail: false,
                }]
            }
        };
        let may_fail = body_may_fail(&body);
        Node::MapOptional {
            dest,
            src,
            payload_type: dest_payload,
            temp,
            body,
            may_fail,
        }
    }
}

fn provider_call(entry: &RegistryEntry, dest: Expr, arg: Expr, site: &Site) -> Node {
    match entry.kind {
        ProviderKind::CustomFunction => Node::CallCustomFunction {
            dest,
            function: entry.provider.clone(),
            arg,
            may_fail: entry.returns_failure,
        },
        ProviderKind::InterfaceMethod { .. } => Node::CallInterfaceMethod {
            dest,
            method: entry.provider.clone(),
            arg,
            ctx: site.ctx.clone(),
            may_fail: entry.returns_failure,
        },
    }
}
