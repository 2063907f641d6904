//! AST node shapes (spec §3, "AST nodes are heap objects"; §9 "Mutable
//! AST fields").
//!
//! The two-pass resolution algorithm (§4.6) mutates `idx`/`global`/
//! `captured` on `Ref`/`Decl` nodes and appends to a `Fun`'s `locals`/
//! `captures` after the node is built. Spec §9 explicitly sanctions an
//! idiomatic alternative to raw pointer rewrites for languages that
//! don't have them: "place resolution data in a side table keyed by
//! node identity, or model mutable fields with interior mutability
//! cells." We take the latter: every AST node is arena-allocated
//! (`bumpalo`, the same crate the teacher uses for its own arenas) and
//! the handful of resolution-mutated fields are `Cell`/`RefCell`, so
//! the tree is built once and annotated in place exactly like the C
//! original's pointer writes, without unsafe code.

use bumpalo::Bump;
use loom_heap::{LStrHandle, Value};
use std::cell::{Cell, RefCell};

use crate::opinfo::OpInfo;

/// Owns the arena every `Node<'a>` in a parsed unit is allocated from.
pub struct AstArena {
    bump: Bump,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena { bump: Bump::new() }
    }

    pub fn alloc<'a, T>(&'a self, value: T) -> &'a T {
        self.bump.alloc(value)
    }

    pub fn alloc_vec<'a, T>(&'a self, values: Vec<T>) -> &'a [T] {
        self.bump.alloc_slice_fill_iter(values)
    }
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RefNode<'a> {
    pub name: LStrHandle,
    pub idx: Cell<u32>,
    pub global: Cell<bool>,
    pub captured: Cell<bool>,
    _marker: std::marker::PhantomData<&'a ()>,
}

pub struct DeclNode<'a> {
    pub name: LStrHandle,
    pub idx: Cell<u32>,
    pub is_const: bool,
    pub captured: Cell<bool>,
    _marker: std::marker::PhantomData<&'a ()>,
}

pub struct UnOpNode<'a> {
    pub op: &'static OpInfo,
    pub expr: &'a Node<'a>,
}

pub struct BinOpNode<'a> {
    pub op: &'static OpInfo,
    pub lhs: &'a Node<'a>,
    pub rhs: &'a Node<'a>,
}

pub struct IfNode<'a> {
    pub test: &'a Node<'a>,
    pub then_branch: &'a Node<'a>,
    pub else_branch: &'a Node<'a>,
}

pub struct CallNode<'a> {
    pub callee: &'a Node<'a>,
    pub args: &'a [&'a Node<'a>],
}

/// A function/closure expression. `parent`/`locals`/`captures` start
/// empty and are filled in by `loom-eval`'s resolution pass
/// (`var_res_pass`/`find_decls`/`var_res`).
pub struct FunNode<'a> {
    pub params: &'a [&'a Node<'a>],
    pub body: &'a Node<'a>,
    pub parent: Cell<Option<&'a Node<'a>>>,
    pub locals: RefCell<Vec<&'a Node<'a>>>,
    pub captures: RefCell<Vec<&'a Node<'a>>>,
}

pub enum Node<'a> {
    Const(Value),
    Str(LStrHandle),
    Ref(RefNode<'a>),
    Decl(DeclNode<'a>),
    UnOp(UnOpNode<'a>),
    BinOp(BinOpNode<'a>),
    Seq(&'a [&'a Node<'a>]),
    ArrayLit(&'a [&'a Node<'a>]),
    If(IfNode<'a>),
    Call(CallNode<'a>),
    Fun(FunNode<'a>),
}

impl<'a> Node<'a> {
    pub fn new_ref(name: LStrHandle) -> Self {
        Node::Ref(RefNode {
            name,
            idx: Cell::new(0),
            global: Cell::new(false),
            captured: Cell::new(false),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn new_decl(name: LStrHandle, is_const: bool) -> Self {
        Node::Decl(DeclNode {
            name,
            idx: Cell::new(0),
            is_const,
            captured: Cell::new(false),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn as_fun(&self) -> Option<&FunNode<'a>> {
        match self {
            Node::Fun(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_decl(&self) -> Option<&DeclNode<'a>> {
        match self {
            Node::Decl(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_node_starts_unresolved() {
        let arena = AstArena::new();
        let name = LStrHandle { addr: 1, len: 1 };
        let node = arena.alloc(Node::new_ref(name));
        if let Node::Ref(r) = node {
            assert!(!r.global.get());
            assert!(!r.captured.get());
        } else {
            panic!("expected Ref");
        }
    }

    #[test]
    fn test_fun_node_locals_start_empty() {
        let arena = AstArena::new();
        let body = arena.alloc(Node::Const(Value::int(1)));
        let fun = arena.alloc(Node::Fun(FunNode {
            params: &[],
            body,
            parent: Cell::new(None),
            locals: RefCell::new(Vec::new()),
            captures: RefCell::new(Vec::new()),
        }));
        assert!(fun.as_fun().unwrap().locals.borrow().is_empty());
    }
}
