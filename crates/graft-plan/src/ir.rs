// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Mapping IR: expressions and nodes produced by the planner.
//!
//! The planner never produces source text. Emitters and the interpreter
//! consume these trees directly.

use graft_model::TypeId;

/// Value or place expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(String),
    Field { base: Box<Expr>, name: String },
    Deref(Box<Expr>),
    AddrOf(Box<Expr>),
    /// `base[index]`, where `index` names a loop variable.
    Index { base: Box<Expr>, index: String },
    Call {
        callee: Callee,
        arg: Box<Expr>,
        /// Ambient context variable, when the callee takes one.
        ctx: Option<String>,
    },
    Zero(TypeId),
    Nil,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(self),
            name: name.into(),
        }
    }

    pub fn deref(self) -> Self {
        Expr::Deref(Box::new(self))
    }

    pub fn addr_of(self) -> Self {
        Expr::AddrOf(Box::new(self))
    }

    pub fn call(callee: Callee, arg: Expr, ctx: Option<String>) -> Self {
        Expr::Call {
            callee,
            arg: Box::new(arg),
            ctx,
        }
    }

    /// Helper targeted by a call expression.
    pub fn called_helper(&self) -> Option<&str> {
        match self {
            Expr::Call {
                callee: Callee::Helper(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// User-declared free function.
    Function(String),
    /// Method on the receiver of the generated implementation.
    Method(String),
    /// Synthesized helper.
    Helper(String),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Function(n) | Callee::Method(n) | Callee::Helper(n) => n,
        }
    }
}

/// Fresh variable names bound by a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVars {
    pub index: String,
    pub elem: String,
    /// Holds the converted element before it is stored.
    pub mapped: String,
}

/// One step of a mapping body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    AssignDirect {
        dest: Expr,
        src: Expr,
    },
    AssignCast {
        dest: Expr,
        src: Expr,
        ty: TypeId,
    },
    CallCustomFunction {
        dest: Expr,
        function: String,
        arg: Expr,
        may_fail: bool,
    },
    CallInterfaceMethod {
        dest: Expr,
        method: String,
        arg: Expr,
        ctx: Option<String>,
        may_fail: bool,
    },
    CallHelper {
        dest: Expr,
        helper: String,
        arg: Expr,
        ctx: Option<String>,
        may_fail: bool,
    },
    /// Element-wise conversion of a sequence, or of a fixed array when
    /// `fixed_len` is set. `body` converts `vars.elem` into `vars.mapped`.
    MapSequence {
        dest: Expr,
        src: Expr,
        dest_type: TypeId,
        elem_type: TypeId,
        vars: LoopVars,
        fixed_len: Option<usize>,
        body: Vec<Node>,
        may_fail: bool,
    },
    /// Value-wise conversion of a map; keys are copied. `vars.index` is the key.
    MapAssociative {
        dest: Expr,
        src: Expr,
        dest_type: TypeId,
        value_type: TypeId,
        vars: LoopVars,
        body: Vec<Node>,
        may_fail: bool,
    },
    /// Pointer-to-pointer conversion: nil stays nil, otherwise `body`
    /// converts `*src` into `temp` and `dest` takes its address.
    MapOptional {
        dest: Expr,
        src: Expr,
        payload_type: TypeId,
        temp: String,
        body: Vec<Node>,
        may_fail: bool,
    },
    Unsupported {
        dest: Expr,
        src_type: TypeId,
        dest_type: TypeId,
    },
    FieldUnresolved {
        field: String,
        reason: String,
    },
    DestInit {
        var: String,
        ty: TypeId,
    },
    GuardEarlyReturnIfNull {
        var: String,
        zero: Expr,
        may_fail: bool,
    },
    Return {
        value: Expr,
        may_fail: bool,
        /// `value` is a call whose failure is returned unchanged.
        forwards_failure: bool,
    },
}

impl Node {
    pub fn may_fail(&self) -> bool {
        match self {
            Node::CallCustomFunction { may_fail, .. }
            | Node::CallInterfaceMethod { may_fail, .. }
            | Node::CallHelper { may_fail, .. }
            | Node::MapSequence { may_fail, .. }
            | Node::MapAssociative { may_fail, .. }
            | Node::MapOptional { may_fail, .. } => *may_fail,
            _ => false,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::MapSequence { body, .. }
            | Node::MapAssociative { body, .. }
            | Node::MapOptional { body, .. } => body,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::MapSequence { body, .. }
            | Node::MapAssociative { body, .. }
            | Node::MapOptional { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Node::Unsupported { .. } | Node::FieldUnresolved { .. })
    }
}

/// Whether any node in `body` may fail.
pub fn body_may_fail(body: &[Node]) -> bool {
    body.iter().any(Node::may_fail)
}

/// Visit every node in `body`, parents before children.
pub fn walk<'a>(body: &'a [Node], f: &mut impl FnMut(&'a Node)) {
    for node in body {
        f(node);
        walk(node.children(), f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(helper: &str, may_fail: bool) -> Node {
        Node::CallHelper {
            dest: Expr::var("dst").field("X"),
            helper: helper.to_string(),
            arg: Expr::var("in").field("X"),
            ctx: None,
            may_fail,
        }
    }

    #[test]
    fn loop_children_are_visited() {
        let body = vec![Node::MapSequence {
            dest: Expr::var("dst").field("Items"),
            src: Expr::var("in").field("Items"),
            dest_type: TypeId(1),
            elem_type: TypeId(2),
            vars: LoopVars {
                index: "i1".into(),
                elem: "v1".into(),
                mapped: "mapped1".into(),
            },
            fixed_len: None,
            body: vec![call("map_a", true)],
            may_fail: true,
        }];
        let mut seen = Vec::new();
        walk(&body, &mut |n| seen.push(n.may_fail()));
        assert_eq!(seen, vec![true, true]);
        assert!(body_may_fail(&body));
    }

    #[test]
    fn called_helper_only_matches_helper_calls() {
        let e = Expr::call(Callee::Helper("map_1".into()), Expr::var("p0"), None);
        assert_eq!(e.called_helper(), Some("map_1"));
        let f = Expr::call(Callee::Function("F".into()), Expr::var("p0"), None);
        assert_eq!(f.called_helper(), None);
        assert!(!call("x", false).is_diagnostic());
    }
}
