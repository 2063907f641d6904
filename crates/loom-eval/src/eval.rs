//! The tree-walking evaluator (spec §4.7), completing
//! `original_source/source/interp.c`'s `eval_assign`/`eval_expr`/
//! `eval_truth` with captured-variable cells and global bindings fully
//! wired, per SPEC_FULL's supplement (the C stubs both with
//! `assert(false)`).
//!
//! Arithmetic/relational operators reinterpret both operand words as
//! `i64` unconditionally, matching the C's lack of a tag check there —
//! memory-safe because no dereference is involved. `[` is the one
//! exception: its left operand's word is a heap address, so unlike the
//! C (which casts blindly) this evaluator checks the tag first rather
//! than risk an invalid dereference.

use loom_heap::{LArrayHandle, Tag, Value, Vm};
use loom_syntax::{opinfo, BinOpNode, CallNode, IfNode, Node, RefNode, UnOpNode};

use crate::cell::{self, CellHandle};
use crate::closure::{self, ClosureHandle};
use crate::error::Fatal;

/// One call frame: the `Fun` node being evaluated, its locals buffer,
/// and the cell addresses its own closure captured (empty for the
/// top-level unit, which has no enclosing closure).
pub struct Frame<'a, 'f> {
    pub fun: &'a Node<'a>,
    pub locals: &'f mut [Value],
    pub cells: &'f [u64],
}

pub struct Interpreter<'v> {
    pub vm: &'v mut Vm,
    cell_shape: u32,
    closure_shape: u32,
    println_name: loom_heap::LStrHandle,
}

impl<'v> Interpreter<'v> {
    pub fn new(vm: &'v mut Vm) -> Result<Self, Fatal> {
        let cell_shape = vm.shapes.register_fixed_kind().0;
        let closure_shape = vm.shapes.register_fixed_kind().0;
        let println_name = vm.intern("println")?;
        Ok(Interpreter { vm, cell_shape, closure_shape, println_name })
    }

    /// Evaluate a fully-resolved top-level unit (the synthetic `Fun`
    /// `loom_syntax::parse_unit` wraps the program in).
    pub fn eval_unit<'a>(&mut self, unit_fun: &'a Node<'a>) -> Result<Value, Fatal> {
        let fun = unit_fun.as_fun().expect("eval_unit expects a resolved Fun node");
        let mut locals = self.prepare_locals(fun)?;
        let cells: Vec<u64> = Vec::new();
        let mut frame = Frame { fun: unit_fun, locals: &mut locals, cells: &cells };
        self.eval_expr(fun.body, &mut frame)
    }

    /// Allocate the locals buffer for one invocation of `fun`, pre-
    /// materializing a cell for every local a nested closure will
    /// capture, so closures built inside this frame can point at a
    /// stable address from the moment the frame begins.
    fn prepare_locals<'a>(&self, fun: &loom_syntax::FunNode<'a>) -> Result<Vec<Value>, Fatal> {
        let decl_nodes: Vec<&'a Node<'a>> = fun.locals.borrow().iter().copied().collect();
        let mut locals = vec![Value::bool(false); decl_nodes.len()];
        for local_node in decl_nodes {
            let decl = local_node.as_decl().unwrap();
            if decl.captured.get() {
                let c = cell::alloc_cell(&self.vm.heap, self.cell_shape, Value::bool(false))?;
                locals[decl.idx.get() as usize] = Value::ptr(c.addr, Tag::RawPtr);
            }
        }
        Ok(locals)
    }

    pub fn eval_expr<'a>(&mut self, expr: &'a Node<'a>, frame: &mut Frame<'a, '_>) -> Result<Value, Fatal> {
        match expr {
            Node::Const(v) => Ok(*v),
            Node::Str(h) => Ok(h.as_value()),
            Node::Decl(d) => Ok(read_local(frame.locals, d)),
            Node::Ref(r) => self.eval_ref(r, frame),
            Node::ArrayLit(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in *items {
                    values.push(self.eval_expr(item, frame)?);
                }
                Ok(self.vm.alloc_array_from(&values)?.as_value())
            }
            Node::UnOp(u) => self.eval_unop(u, frame),
            Node::Seq(exprs) => {
                let mut last = Value::bool(false);
                for e in *exprs {
                    last = self.eval_expr(e, frame)?;
                }
                Ok(last)
            }
            Node::If(i) => self.eval_if(i, frame),
            Node::Fun(_) => self.eval_fun_literal(expr, frame),
            Node::Call(c) => self.eval_call(c, frame),
            Node::BinOp(b) => self.eval_binop(b, frame),
        }
    }

    fn eval_ref<'a>(&mut self, r: &RefNode<'a>, frame: &Frame<'a, '_>) -> Result<Value, Fatal> {
        if r.global.get() {
            self.vm.global_get(&r.name).ok_or(Fatal::UnknownGlobal)
        } else if r.captured.get() {
            let cell_addr = frame.cells[r.idx.get() as usize];
            Ok(unsafe { CellHandle { addr: cell_addr }.get() })
        } else {
            let decl = local_decl(frame.fun, r.idx.get());
            Ok(read_local(frame.locals, decl))
        }
    }

    fn eval_unop<'a>(&mut self, u: &UnOpNode<'a>, frame: &mut Frame<'a, '_>) -> Result<Value, Fatal> {
        let v = self.eval_expr(u.expr, frame)?;
        if std::ptr::eq(u.op, &opinfo::OP_NEG) {
            if !v.is_int() {
                return Err(Fatal::UnaryOperandNotInt);
            }
            Ok(Value::int((v.raw_word() as i64).wrapping_neg()))
        } else if std::ptr::eq(u.op, &opinfo::OP_NOT) {
            Ok(Value::bool(!eval_truth(v)?))
        } else {
            tracing::warn!(op = u.op.spelling, "unsupported unary operator combination");
            Ok(Value::bool(false))
        }
    }

    fn eval_if<'a>(&mut self, i: &IfNode<'a>, frame: &mut Frame<'a, '_>) -> Result<Value, Fatal> {
        let test = self.eval_expr(i.test, frame)?;
        if eval_truth(test)? {
            self.eval_expr(i.then_branch, frame)
        } else {
            self.eval_expr(i.else_branch, frame)
        }
    }

    fn eval_binop<'a>(&mut self, b: &BinOpNode<'a>, frame: &mut Frame<'a, '_>) -> Result<Value, Fatal> {
        if std::ptr::eq(b.op, &opinfo::OP_ASSIGN) {
            return self.eval_assign(b.lhs, b.rhs, frame);
        }
        let v0 = self.eval_expr(b.lhs, frame)?;
        let v1 = self.eval_expr(b.rhs, frame)?;

        if std::ptr::eq(b.op, &opinfo::OP_INDEX) {
            if v0.tag() != Tag::Array {
                return Err(Fatal::IndexTargetNotArray);
            }
            let arr = LArrayHandle { addr: v0.as_addr() };
            let idx = v1.raw_word() as i64;
            return Ok(unsafe { arr.get(&self.vm.heap, idx) }?);
        }
        if std::ptr::eq(b.op, &opinfo::OP_EQ) {
            return Ok(Value::bool(v0 == v1));
        }
        if std::ptr::eq(b.op, &opinfo::OP_NE) {
            return Ok(Value::bool(v0 != v1));
        }

        // Arithmetic/relational: words are reinterpreted as i64
        // unconditionally, matching the C original.
        let i0 = v0.raw_word() as i64;
        let i1 = v1.raw_word() as i64;
        if std::ptr::eq(b.op, &opinfo::OP_ADD) {
            return Ok(Value::int(i0.wrapping_add(i1)));
        }
        if std::ptr::eq(b.op, &opinfo::OP_SUB) {
            return Ok(Value::int(i0.wrapping_sub(i1)));
        }
        if std::ptr::eq(b.op, &opinfo::OP_MUL) {
            return Ok(Value::int(i0.wrapping_mul(i1)));
        }
        if std::ptr::eq(b.op, &opinfo::OP_DIV) {
            if i1 == 0 {
                return Err(Fatal::DivisionByZero);
            }
            return Ok(Value::int(i0.wrapping_div(i1)));
        }
        if std::ptr::eq(b.op, &opinfo::OP_MOD) {
            if i1 == 0 {
                return Err(Fatal::DivisionByZero);
            }
            return Ok(Value::int(i0.wrapping_rem(i1)));
        }
        if std::ptr::eq(b.op, &opinfo::OP_LT) {
            return Ok(Value::bool(i0 < i1));
        }
        if std::ptr::eq(b.op, &opinfo::OP_LE) {
            return Ok(Value::bool(i0 <= i1));
        }
        if std::ptr::eq(b.op, &opinfo::OP_GT) {
            return Ok(Value::bool(i0 > i1));
        }
        if std::ptr::eq(b.op, &opinfo::OP_GE) {
            return Ok(Value::bool(i0 >= i1));
        }

        tracing::warn!(op = b.op.spelling, "unsupported binary operator combination");
        Ok(Value::bool(false))
    }

    fn eval_assign<'a>(
        &mut self,
        lhs: &'a Node<'a>,
        rhs: &'a Node<'a>,
        frame: &mut Frame<'a, '_>,
    ) -> Result<Value, Fatal> {
        let v = self.eval_expr(rhs, frame)?;
        match lhs {
            Node::Decl(d) => {
                write_local(frame.locals, d, v);
                Ok(v)
            }
            Node::Ref(r) => {
                if r.captured.get() {
                    let cell_addr = frame.cells[r.idx.get() as usize];
                    unsafe { CellHandle { addr: cell_addr }.set(v) };
                    Ok(v)
                } else if r.global.get() {
                    self.vm.global_set(&r.name, v)?;
                    Ok(v)
                } else {
                    Err(Fatal::InvalidAssignTarget)
                }
            }
            _ => Err(Fatal::InvalidAssignTarget),
        }
    }

    fn eval_fun_literal<'a>(&mut self, expr: &'a Node<'a>, frame: &Frame<'a, '_>) -> Result<Value, Fatal> {
        let fun = expr.as_fun().unwrap();
        let captures = fun.captures.borrow();
        let mut cell_addrs = Vec::with_capacity(captures.len());
        for local_node in captures.iter() {
            let decl = local_node.as_decl().unwrap();
            let owner_is_current_frame =
                frame.fun.as_fun().unwrap().locals.borrow().iter().any(|l| std::ptr::eq(*l, *local_node));
            let addr = if owner_is_current_frame {
                frame.locals[decl.idx.get() as usize].as_addr()
            } else {
                let pos = frame
                    .fun
                    .as_fun()
                    .unwrap()
                    .captures
                    .borrow()
                    .iter()
                    .position(|c| std::ptr::eq(*c, *local_node))
                    .expect("enclosing function must also have threaded this capture");
                frame.cells[pos]
            };
            cell_addrs.push(addr);
        }
        let handle = closure::alloc_closure(&self.vm.heap, self.closure_shape, closure::node_ptr(expr), &cell_addrs)?;
        Ok(handle.as_value())
    }

    fn eval_call<'a>(&mut self, c: &CallNode<'a>, frame: &mut Frame<'a, '_>) -> Result<Value, Fatal> {
        if let Node::Ref(r) = c.callee {
            if r.global.get() && r.name.addr == self.println_name.addr && c.args.len() == 1 {
                let v = self.eval_expr(c.args[0], frame)?;
                let text = self.canonical_form(v);
                println!("{text}");
                return Ok(Value::bool(true));
            }
        }

        let callee_val = self.eval_expr(c.callee, frame)?;
        if callee_val.tag() != Tag::Closure {
            return Err(Fatal::CallTargetNotClosure);
        }
        let closure = ClosureHandle { addr: callee_val.as_addr() };
        // SAFETY: `fun_ptr` was produced by `closure::node_ptr` from a
        // node in the same arena that outlives this evaluation.
        let fun_node: &'a Node<'a> = unsafe { closure::node_from_ptr(closure.fun_ptr()) };
        let fun = fun_node.as_fun().unwrap();
        if c.args.len() != fun.params.len() {
            return Err(Fatal::ArityMismatch { expected: fun.params.len(), found: c.args.len() });
        }

        let mut callee_locals = self.prepare_locals(fun)?;
        for (i, arg_expr) in c.args.iter().enumerate() {
            let v = self.eval_expr(arg_expr, frame)?;
            let param_decl = fun.params[i].as_decl().unwrap();
            write_local(&mut callee_locals, param_decl, v);
        }
        let callee_cells = unsafe { closure.cells() };
        let mut callee_frame = Frame { fun: fun_node, locals: &mut callee_locals, cells: &callee_cells };
        self.eval_expr(fun.body, &mut callee_frame)
    }

    /// The canonical printed form of a value (spec §4.8 "println"):
    /// bare `true`/`false`, decimal integers, raw (unquoted) string
    /// bytes, recursive `[e1, e2, ...]` arrays, and `<function>` for
    /// closures.
    pub fn canonical_form(&self, v: Value) -> String {
        match v.tag() {
            Tag::Bool => if v.as_bool() { "true" } else { "false" }.to_string(),
            Tag::Int64 => v.as_int().to_string(),
            Tag::Float64 => v.as_float().to_string(),
            Tag::String => {
                // SAFETY: `v` carries the address of a string previously
                // interned into this Vm's heap.
                let handle = unsafe { loom_heap::LStrHandle::from_addr(&self.vm.heap, v.as_addr()) };
                unsafe { handle.as_str(&self.vm.heap) }.to_string()
            }
            Tag::Array => {
                let arr = LArrayHandle { addr: v.as_addr() };
                // SAFETY: `v` carries the address of an array allocated
                // on this Vm's heap.
                let len = unsafe { arr.len(&self.vm.heap) };
                let mut parts = Vec::with_capacity(len as usize);
                for i in 0..len {
                    let item = unsafe { arr.get(&self.vm.heap, i as i64) }.expect("within bounds by construction");
                    parts.push(self.canonical_form(item));
                }
                format!("[{}]", parts.join(", "))
            }
            Tag::Closure => "<function>".to_string(),
            Tag::Object => "<object>".to_string(),
            Tag::RawPtr => "<ptr>".to_string(),
            Tag::RunError => "<error>".to_string(),
        }
    }
}

/// `if`/`not` require a strict `Bool` in test position (spec §4.7).
pub fn eval_truth(v: Value) -> Result<bool, Fatal> {
    if v.tag() == Tag::Bool {
        Ok(v.as_bool())
    } else {
        Err(Fatal::NonBooleanCondition)
    }
}

fn local_decl<'a>(fun_node: &'a Node<'a>, idx: u32) -> &'a loom_syntax::DeclNode<'a> {
    let node: &'a Node<'a> = fun_node.as_fun().unwrap().locals.borrow()[idx as usize];
    node.as_decl().unwrap()
}

fn read_local(locals: &[Value], decl: &loom_syntax::DeclNode<'_>) -> Value {
    if decl.captured.get() {
        let cell_addr = locals[decl.idx.get() as usize].as_addr();
        // SAFETY: a captured decl's slot always holds a cell address,
        // installed by `prepare_locals` before the body ever runs.
        unsafe { CellHandle { addr: cell_addr }.get() }
    } else {
        locals[decl.idx.get() as usize]
    }
}

fn write_local(locals: &mut [Value], decl: &loom_syntax::DeclNode<'_>, value: Value) {
    if decl.captured.get() {
        let cell_addr = locals[decl.idx.get() as usize].as_addr();
        // SAFETY: see `read_local`.
        unsafe { CellHandle { addr: cell_addr }.set(value) };
    } else {
        locals[decl.idx.get() as usize] = value;
    }
}
