//! Growable tagged-value arrays (spec §4.2).
//!
//! Layout: `[shape:u32][cap:u32][len:u32][pad:u32][Value; cap]`. `set`
//! auto-extends `len` up to `cap`; both `get` and an over-capacity `set`
//! are fatal invariant violations, surfaced here as `ArrayError` so the
//! evaluator can turn them into its own fatal-message format instead of
//! panicking mid-allocation.

use crate::heap::{Heap, HeapError};
use crate::tag::{Tag, Value};

const HEADER_LEN: usize = 16;
const VALUE_SIZE: usize = std::mem::size_of::<Value>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayError {
    IndexOutOfRange { index: i64, len: u32 },
    SetBeyondCapacity { index: i64, capacity: u32 },
    Heap(HeapError),
}

impl std::fmt::Display for ArrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArrayError::IndexOutOfRange { index, len } => {
                write!(f, "array index {index} out of range (len {len})")
            }
            ArrayError::SetBeyondCapacity { index, capacity } => {
                write!(f, "array index {index} beyond capacity {capacity}")
            }
            ArrayError::Heap(e) => write!(f, "{e}"),
        }
    }
}
impl std::error::Error for ArrayError {}
impl From<HeapError> for ArrayError {
    fn from(e: HeapError) -> Self {
        ArrayError::Heap(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LArrayHandle {
    pub addr: u64,
}

impl LArrayHandle {
    pub fn as_value(&self) -> Value {
        Value::ptr(self.addr, Tag::Array)
    }

    /// # Safety
    /// `heap` must be the heap this array was allocated on.
    pub unsafe fn capacity(&self, heap: &Heap) -> u32 {
        u32::from_le_bytes(heap.read_bytes(self.addr + 4, 4).try_into().unwrap())
    }

    /// # Safety
    /// `heap` must be the heap this array was allocated on.
    pub unsafe fn len(&self, heap: &Heap) -> u32 {
        u32::from_le_bytes(heap.read_bytes(self.addr + 8, 4).try_into().unwrap())
    }

    fn set_len(&self, heap: &Heap, len: u32) {
        // SAFETY: offset 8..12 is the length field of a valid array.
        unsafe {
            heap.write_bytes(self.addr + 8, 4).copy_from_slice(&len.to_le_bytes());
        }
    }

    fn slot_addr(&self, index: u32) -> u64 {
        self.addr + HEADER_LEN as u64 + (index as u64) * VALUE_SIZE as u64
    }

    /// Fatal on out-of-range: `index` must be `>= 0` and `< len`.
    ///
    /// # Safety
    /// `heap` must be the heap this array was allocated on.
    pub unsafe fn get(&self, heap: &Heap, index: i64) -> Result<Value, ArrayError> {
        let len = self.len(heap);
        if index < 0 || index as u64 >= len as u64 {
            return Err(ArrayError::IndexOutOfRange { index, len });
        }
        let ptr = self.slot_addr(index as u32) as *const Value;
        Ok(*ptr)
    }

    /// Auto-extends `len` up to `cap` when `index == len`; fatal beyond
    /// `cap`.
    ///
    /// # Safety
    /// `heap` must be the heap this array was allocated on.
    pub unsafe fn set(&self, heap: &Heap, index: i64, value: Value) -> Result<(), ArrayError> {
        let cap = self.capacity(heap);
        if index < 0 || index as u64 >= cap as u64 {
            return Err(ArrayError::SetBeyondCapacity { index, capacity: cap });
        }
        let len = self.len(heap);
        if index as u64 >= len as u64 {
            self.set_len(heap, index as u32 + 1);
        }
        let ptr = self.slot_addr(index as u32) as *mut Value;
        *ptr = value;
        Ok(())
    }
}

pub fn alloc(heap: &Heap, capacity: u32, array_shape: u32) -> Result<LArrayHandle, HeapError> {
    let size = HEADER_LEN + capacity as usize * VALUE_SIZE;
    let addr = heap.alloc(size, array_shape)?;
    // SAFETY: freshly allocated region, exclusively owned here.
    unsafe {
        let region = heap.write_bytes(addr, HEADER_LEN);
        region[4..8].copy_from_slice(&capacity.to_le_bytes());
        region[8..12].copy_from_slice(&0u32.to_le_bytes());
    }
    Ok(LArrayHandle { addr })
}

/// Allocate and fill from `items` in one step (used for array literals
/// and `Seq`'s argument lists), `len == cap == items.len()`.
pub fn alloc_from(heap: &Heap, items: &[Value], array_shape: u32) -> Result<LArrayHandle, HeapError> {
    let handle = alloc(heap, items.len() as u32, array_shape)?;
    for (i, v) in items.iter().enumerate() {
        // SAFETY: index is within the just-allocated capacity.
        unsafe { handle.set(heap, i as i64, *v).expect("within capacity") };
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_extends_len_up_to_capacity() {
        let heap = Heap::new();
        let arr = alloc(&heap, 4, 1).unwrap();
        unsafe {
            assert_eq!(arr.len(&heap), 0);
            arr.set(&heap, 0, Value::int(10)).unwrap();
            assert_eq!(arr.len(&heap), 1);
            arr.set(&heap, 2, Value::int(30)).unwrap();
            assert_eq!(arr.len(&heap), 3);
        }
    }

    #[test]
    fn test_set_beyond_capacity_is_fatal_error() {
        let heap = Heap::new();
        let arr = alloc(&heap, 2, 1).unwrap();
        let err = unsafe { arr.set(&heap, 2, Value::int(1)) }.unwrap_err();
        assert!(matches!(err, ArrayError::SetBeyondCapacity { .. }));
    }

    #[test]
    fn test_get_out_of_range_is_fatal_error() {
        let heap = Heap::new();
        let arr = alloc(&heap, 2, 1).unwrap();
        unsafe { arr.set(&heap, 0, Value::int(7)).unwrap() };
        assert!(unsafe { arr.get(&heap, 1) }.is_err());
        assert!(unsafe { arr.get(&heap, -1) }.is_err());
    }

    #[test]
    fn test_alloc_from_literal() {
        let heap = Heap::new();
        let items = [Value::int(0), Value::int(1), Value::int(2)];
        let arr = alloc_from(&heap, &items, 1).unwrap();
        unsafe {
            assert_eq!(arr.len(&heap), 3);
            assert_eq!(arr.get(&heap, 0).unwrap(), Value::int(0));
            assert_eq!(arr.get(&heap, 2).unwrap(), Value::int(2));
        }
    }
}
