//! Closures: a heap object holding a pointer to the closure's `Fun` AST
//! node plus an inline array of pointers to the mutable cells it
//! captured (spec §3 "Closure").
//!
//! The AST lives in a separate `bumpalo` arena from the hosted heap (see
//! `loom_syntax::ast`'s module doc), so the "pointer to its Fun AST" the
//! spec describes is the raw address of that arena-allocated node,
//! carried as a plain `u64` the same way the original C stores a raw
//! `ast_fun_t*` in its heap-resident `clos_t` — sound here because the
//! arena outlives every `Vm`/`Interpreter` built over it (both are
//! constructed once per run and torn down together).
//!
//! Layout: `[shape:u32][pad:u32][fun_ptr:u64][num_cells:u32][pad:u32][cell_addr:u64; num_cells]`.

use loom_heap::{Heap, HeapError, Tag, Value};
use loom_syntax::Node;

const HEADER_LEN: u64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosureHandle {
    pub addr: u64,
}

impl ClosureHandle {
    pub fn as_value(&self) -> Value {
        Value::ptr(self.addr, Tag::Closure)
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_closure`.
    pub unsafe fn fun_ptr(&self) -> u64 {
        unsafe { *((self.addr + 8) as *const u64) }
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_closure`.
    pub unsafe fn num_cells(&self) -> u32 {
        unsafe { *((self.addr + 16) as *const u32) }
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_closure`, and
    /// `index` must be `< num_cells()`.
    pub unsafe fn cell_addr(&self, index: u32) -> u64 {
        unsafe { *((self.addr + HEADER_LEN + index as u64 * 8) as *const u64) }
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_closure`.
    pub unsafe fn cells(&self) -> Vec<u64> {
        let n = unsafe { self.num_cells() };
        // SAFETY: `i < n` for every iteration.
        (0..n).map(|i| unsafe { self.cell_addr(i) }).collect()
    }
}

pub fn alloc_closure(heap: &Heap, shape: u32, fun_ptr: u64, cells: &[u64]) -> Result<ClosureHandle, HeapError> {
    let size = HEADER_LEN as usize + cells.len() * 8;
    let addr = heap.alloc(size, shape)?;
    // SAFETY: `addr` was just allocated with exactly this layout.
    unsafe {
        *((addr + 8) as *mut u64) = fun_ptr;
        *((addr + 16) as *mut u32) = cells.len() as u32;
        for (i, c) in cells.iter().enumerate() {
            *((addr + HEADER_LEN + i as u64 * 8) as *mut u64) = *c;
        }
    }
    Ok(ClosureHandle { addr })
}

/// Pack an AST node reference into a raw address for storage in a
/// closure's heap bytes.
pub fn node_ptr<'a>(node: &'a Node<'a>) -> u64 {
    node as *const Node<'a> as u64
}

/// Unpack an address produced by `node_ptr` back into a node reference.
///
/// # Safety
/// `ptr` must have come from `node_ptr` applied to a `Node<'a>` allocated
/// in an arena that outlives the returned reference's use.
pub unsafe fn node_from_ptr<'a>(ptr: u64) -> &'a Node<'a> {
    unsafe { &*(ptr as *const Node<'a>) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_heap::Value;

    #[test]
    fn test_closure_roundtrip() {
        let heap = Heap::new();
        let cells = [0x1000u64, 0x2000u64];
        let closure = alloc_closure(&heap, 1, 0xABCD, &cells).unwrap();
        assert_eq!(unsafe { closure.fun_ptr() }, 0xABCD);
        assert_eq!(unsafe { closure.num_cells() }, 2);
        assert_eq!(unsafe { closure.cells() }, vec![0x1000, 0x2000]);
        assert_eq!(closure.as_value().tag(), Value::ptr(closure.addr, loom_heap::Tag::Closure).tag());
    }

    #[test]
    fn test_closure_with_no_captures() {
        let heap = Heap::new();
        let closure = alloc_closure(&heap, 1, 0x1, &[]).unwrap();
        assert_eq!(unsafe { closure.num_cells() }, 0);
        assert!(unsafe { closure.cells() }.is_empty());
    }
}
