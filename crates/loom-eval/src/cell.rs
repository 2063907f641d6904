//! Mutable one-slot heap cells, the indirection captured variables go
//! through (spec §3/§9 "Closure cells"; SPEC_FULL's "captured-variable
//! cells are fully wired" supplement).
//!
//! Layout: `[shape:u32][pad:u32][Value; 1]`, addressed exactly like
//! `loom_heap::array`'s fixed-layout objects.

use loom_heap::{Heap, HeapError, Tag, Value};

const HEADER_LEN: u64 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellHandle {
    pub addr: u64,
}

impl CellHandle {
    pub fn as_value(&self) -> Value {
        Value::ptr(self.addr, Tag::RawPtr)
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_cell`.
    pub unsafe fn get(&self) -> Value {
        let ptr = (self.addr + HEADER_LEN) as *const Value;
        unsafe { *ptr }
    }

    /// # Safety
    /// `self.addr` must have been produced by `alloc_cell`.
    pub unsafe fn set(&self, v: Value) {
        let ptr = (self.addr + HEADER_LEN) as *mut Value;
        unsafe { *ptr = v };
    }
}

pub fn alloc_cell(heap: &Heap, shape: u32, init: Value) -> Result<CellHandle, HeapError> {
    let addr = heap.alloc(HEADER_LEN as usize + std::mem::size_of::<Value>(), shape)?;
    let handle = CellHandle { addr };
    // SAFETY: `addr` was just allocated with room for one `Value`.
    unsafe { handle.set(init) };
    Ok(handle)
}
