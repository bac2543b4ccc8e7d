// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Failure propagation analysis.
//!
//! A helper is fallible when its body contains a failing provider call or
//! calls a fallible helper, at any loop depth. Direct failures seed a work
//! queue; fallibility then flows backwards along the helper call graph
//! until nothing changes. The result is used to rewrite call, loop and
//! return nodes so emitters know where failures must be checked.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::helpers::HelperPlan;
use crate::ir::{body_may_fail, walk, Node};
use crate::methods::InterfacePlan;

/// Names of every fallible helper.
pub fn fallible_helpers(helpers: &[HelperPlan]) -> HashSet<String> {
    // callee -> callers
    let mut callers: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut fallible = HashSet::new();
    let mut queue = VecDeque::new();

    for helper in helpers {
        let mut direct = false;
        walk(&helper.body, &mut |node| match node {
            Node::CallCustomFunction { may_fail: true, .. }
            | Node::CallInterfaceMethod { may_fail: true, .. } => direct = true,
            Node::CallHelper { helper: callee, .. } => {
                callers.entry(callee.as_str()).or_default().push(&helper.name);
            }
            Node::Return { value, .. } => {
                if let Some(callee) = value.called_helper() {
                    callers.entry(callee).or_default().push(&helper.name);
                }
            }
            _ => {}
        });
        if direct && fallible.insert(helper.name.clone()) {
            queue.push_back(helper.name.as_str());
        }
    }

    while let Some(name) = queue.pop_front() {
        for &caller in callers.get(name).into_iter().flatten() {
            if fallible.insert(caller.to_string()) {
                log::trace!("{caller} fails through {name}");
                queue.push_back(caller);
            }
        }
    }
    fallible
}

/// Rewrite failure flags on every helper and method body.
pub fn annotate(helpers: &mut [HelperPlan], interfaces: &mut [InterfacePlan], fallible: &HashSet<String>) {
    for helper in helpers.iter_mut() {
        helper.fallible = fallible.contains(&helper.name);
        annotate_body(&mut helper.body, fallible);
        for node in helper.body.iter_mut() {
            match node {
                Node::Return { may_fail, .. } | Node::GuardEarlyReturnIfNull { may_fail, .. } => {
                    *may_fail = helper.fallible;
                }
                _ => {}
            }
        }
    }

    for iface in interfaces.iter_mut() {
        for method in iface.methods.iter_mut() {
            annotate_body(&mut method.body, fallible);
            for node in method.body.iter_mut() {
                match node {
                    Node::Return {
                        value,
                        may_fail,
                        forwards_failure,
                    } => {
                        *may_fail = method.fallible;
                        *forwards_failure = method.fallible
                            && value.called_helper().is_some_and(|h| fallible.contains(h));
                    }
                    Node::GuardEarlyReturnIfNull { may_fail, .. } => *may_fail = method.fallible,
                    _ => {}
                }
            }
        }
    }
}

fn annotate_body(body: &mut [Node], fallible: &HashSet<String>) {
    for node in body.iter_mut() {
        if let Some(children) = node.children_mut() {
            annotate_body(children, fallible);
        }
        match node {
            Node::CallHelper {
                helper, may_fail, ..
            } => *may_fail = fallible.contains(helper.as_str()),
            Node::MapSequence { body, may_fail, .. }
            | Node::MapAssociative { body, may_fail, .. }
            | Node::MapOptional { body, may_fail, .. } => *may_fail = body_may_fail(body),
            _ => {}
        }
    }
}

/// Whether `body` raises a failure that its function must return.
pub fn needs_failure_path(body: &[Node], fallible: &HashSet<String>) -> bool {
    let mut needed = false;
    walk(body, &mut |node| match node {
        Node::Return { value, .. } => {
            if value.called_helper().is_some_and(|h| fallible.contains(h)) {
                needed = true;
            }
        }
        other => needed |= other.may_fail(),
    });
    needed
}
