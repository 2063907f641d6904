//! Shaped user objects (spec §4.4): a heap header plus a shape index
//! plus raw property-slot bytes addressed by shape offset.

use crate::heap::{Heap, HeapError};
use crate::shape::{PropAttrs, ShapeId, ShapeTable};
use crate::string::LStrHandle;
use crate::tag::{Tag, Value};

const HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectError {
    Heap(HeapError),
    /// Writing a property whose declared tag differs from the value's
    /// tag without going through the fork path (an evaluator bug, not a
    /// user-reachable error: the evaluator always resolves the correct
    /// child shape before writing).
    TagMismatch { expected: Tag, found: Tag },
    ConstReassignment,
}

impl std::fmt::Display for ObjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectError::Heap(e) => write!(f, "{e}"),
            ObjectError::TagMismatch { expected, found } => {
                write!(f, "property tag mismatch: expected {expected:?}, found {found:?}")
            }
            ObjectError::ConstReassignment => write!(f, "cannot reassign a const property"),
        }
    }
}
impl std::error::Error for ObjectError {}
impl From<HeapError> for ObjectError {
    fn from(e: HeapError) -> Self {
        ObjectError::Heap(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHandle {
    pub addr: u64,
}

impl ObjectHandle {
    pub fn as_value(&self) -> Value {
        Value::ptr(self.addr, Tag::Object)
    }

    /// # Safety
    /// `heap` must be the heap this object was allocated on.
    pub unsafe fn capacity(&self, heap: &Heap) -> u32 {
        u32::from_le_bytes(heap.read_bytes(self.addr + 4, 4).try_into().unwrap())
    }

    fn current_shape(&self, heap: &Heap) -> ShapeId {
        // SAFETY: the shape header is written by `alloc` and this module
        // keeps it current on every successful `set`.
        ShapeId(unsafe { heap.shape_of(self.addr) })
    }

    fn set_shape(&self, heap: &Heap, shape: ShapeId) {
        // SAFETY: offset 0..4 is the header field.
        unsafe {
            heap.write_bytes(self.addr, 4).copy_from_slice(&shape.0.to_le_bytes());
        }
    }

    /// Read a property by interned name address, walking the current
    /// shape chain toward the root.
    ///
    /// # Safety
    /// `heap`/`shapes` must be the heap/table this object belongs to.
    pub unsafe fn get(&self, heap: &Heap, shapes: &ShapeTable, name_addr: u64) -> Option<Value> {
        let shape = self.current_shape(heap);
        let owner = shapes.find_property(shape, name_addr)?;
        let offset = shapes.offset_of(owner);
        let tag = shapes.tag_of(owner);
        let ptr = (self.addr + HEADER_LEN as u64 + offset as u64) as *const u8;
        Some(read_value(ptr, tag))
    }

    /// Set a property by interned name address. If the property does
    /// not yet exist on this object's shape, the shape chain is
    /// extended (synthesizing a new shape, or reusing one already
    /// synthesized for an object with the same history). A
    /// `PropAttrs::CONST` redefinition with the same tag re-checks value
    /// equality rather than rewriting; a different tag forks the tree
    /// (spec §4.4's fork rule), which this allocator-less in-place
    /// layout cannot support in general, so it is reported as an error
    /// rather than silently corrupting neighboring slots.
    ///
    /// # Safety
    /// `heap`/`shapes` must be the heap/table this object belongs to,
    /// and the object's allocated capacity must be large enough for
    /// every property ever added to it (callers size objects generously
    /// up front; see `alloc`).
    pub unsafe fn set(
        &self,
        heap: &Heap,
        shapes: &mut ShapeTable,
        name_addr: u64,
        tag: Tag,
        attrs: PropAttrs,
        value: Value,
    ) -> Result<(), ObjectError> {
        let shape = self.current_shape(heap);
        if let Some(owner) = shapes.find_property(shape, name_addr) {
            let owner_tag = shapes.tag_of(owner);
            if owner_tag != tag {
                return Err(ObjectError::TagMismatch { expected: owner_tag, found: tag });
            }
            if shapes.attrs_of(owner).contains(PropAttrs::CONST) {
                let offset = shapes.offset_of(owner);
                let ptr = (self.addr + HEADER_LEN as u64 + offset as u64) as *const u8;
                if read_value(ptr, owner_tag) != value {
                    return Err(ObjectError::ConstReassignment);
                }
            }
            let offset = shapes.offset_of(owner);
            write_value((self.addr + HEADER_LEN as u64 + offset as u64) as *mut u8, value);
            return Ok(());
        }
        let field_size = value_field_size(tag);
        let next = shapes.child(shape, name_addr, tag, attrs, field_size);
        let needed = shapes.size_of(next);
        debug_assert!(
            needed <= self.capacity(heap),
            "object undersized for its property chain"
        );
        write_value((self.addr + HEADER_LEN as u64 + shapes.offset_of(next) as u64) as *mut u8, value);
        self.set_shape(heap, next);
        Ok(())
    }
}

fn value_field_size(tag: Tag) -> u8 {
    match tag {
        Tag::Bool => 1,
        _ => std::mem::size_of::<u64>() as u8,
    }
}

fn read_value(ptr: *const u8, tag: Tag) -> Value {
    match tag {
        Tag::Bool => {
            // SAFETY: caller guarantees `ptr` addresses a live 1-byte field.
            let b = unsafe { *ptr };
            Value::bool(b != 0)
        }
        Tag::Int64 => Value::int(read_u64(ptr) as i64),
        Tag::Float64 => Value::float(f64::from_bits(read_u64(ptr))),
        Tag::String | Tag::Array | Tag::Object | Tag::Closure | Tag::RawPtr => {
            Value::ptr(read_u64(ptr), tag)
        }
        Tag::RunError => Value::ptr(read_u64(ptr), Tag::RunError),
    }
}

fn write_value(ptr: *mut u8, value: Value) {
    match value.tag() {
        Tag::Bool => unsafe { *ptr = value.as_bool() as u8 },
        Tag::Int64 => write_u64(ptr, value.as_int() as u64),
        Tag::Float64 => write_u64(ptr, value.as_float().to_bits()),
        _ => write_u64(ptr, value.as_addr()),
    }
}

fn read_u64(ptr: *const u8) -> u64 {
    // SAFETY: caller guarantees `ptr` addresses a live 8-byte field.
    unsafe { (ptr as *const u64).read_unaligned() }
}

fn write_u64(ptr: *mut u8, word: u64) {
    // SAFETY: caller guarantees `ptr` addresses a live 8-byte field.
    unsafe { (ptr as *mut u64).write_unaligned(word) };
}

/// Allocate a fresh empty object with room for `max_properties` 8-byte
/// slots — objects don't relocate, so callers size them for the widest
/// shape their program logic will ever reach.
pub fn alloc(heap: &Heap, max_properties: u32, base_shape: ShapeId) -> Result<ObjectHandle, HeapError> {
    let size = HEADER_LEN + max_properties as usize * std::mem::size_of::<u64>();
    let addr = heap.alloc(size, base_shape.0)?;
    Ok(ObjectHandle { addr })
}

pub fn string_name(handle: &LStrHandle) -> u64 {
    handle.addr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeTable;

    #[test]
    fn test_set_then_get_roundtrips() {
        let heap = Heap::new();
        let mut shapes = ShapeTable::new();
        let obj = alloc(&heap, 4, ShapeTable::ROOT).unwrap();
        unsafe {
            obj.set(&heap, &mut shapes, 0xA, Tag::Int64, PropAttrs::NONE, Value::int(42)).unwrap();
            assert_eq!(obj.get(&heap, &shapes, 0xA), Some(Value::int(42)));
        }
    }

    #[test]
    fn test_two_objects_with_same_property_history_share_shape() {
        let heap = Heap::new();
        let mut shapes = ShapeTable::new();
        let a = alloc(&heap, 4, ShapeTable::ROOT).unwrap();
        let b = alloc(&heap, 4, ShapeTable::ROOT).unwrap();
        unsafe {
            a.set(&heap, &mut shapes, 0x1, Tag::Int64, PropAttrs::NONE, Value::int(1)).unwrap();
            b.set(&heap, &mut shapes, 0x1, Tag::Int64, PropAttrs::NONE, Value::int(2)).unwrap();
        }
        assert_eq!(a.current_shape(&heap), b.current_shape(&heap));
    }

    #[test]
    fn test_const_property_rejects_value_change() {
        let heap = Heap::new();
        let mut shapes = ShapeTable::new();
        let obj = alloc(&heap, 4, ShapeTable::ROOT).unwrap();
        unsafe {
            obj.set(&heap, &mut shapes, 0x1, Tag::Int64, PropAttrs::CONST, Value::int(1)).unwrap();
            let err = obj.set(&heap, &mut shapes, 0x1, Tag::Int64, PropAttrs::CONST, Value::int(2)).unwrap_err();
            assert_eq!(err, ObjectError::ConstReassignment);
        }
    }

    #[test]
    fn test_unknown_property_returns_none() {
        let heap = Heap::new();
        let shapes = ShapeTable::new();
        let obj = alloc(&heap, 4, ShapeTable::ROOT).unwrap();
        assert_eq!(unsafe { obj.get(&heap, &shapes, 0xDEAD) }, None);
    }
}
