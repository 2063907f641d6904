//! The hosted heap: bump allocation, tagged values, string interning
//! and the shape-based object model (spec §3, §4.1–§4.4).

pub mod array;
pub mod heap;
pub mod object;
pub mod shape;
pub mod string;
pub mod tag;

pub use array::{ArrayError, LArrayHandle};
pub use heap::{Heap, HeapError, HEAP_SIZE};
pub use object::{ObjectError, ObjectHandle};
pub use shape::{PropAttrs, ShapeId, ShapeTable};
pub use string::{Interner, LStrHandle};
pub use tag::{Tag, Value};

/// Bundles the heap, the string/shape tables and the global object —
/// the mutable state every other crate threads through. Mirrors
/// `original_source/source/vm.h`'s `vm_t`.
pub struct Vm {
    pub heap: Heap,
    pub strings: Interner,
    pub shapes: ShapeTable,
    /// Shape reserved for interned string headers.
    pub string_shape: ShapeId,
    /// Shape reserved for array headers.
    pub array_shape: ShapeId,
    /// The single global object bindings resolve into when a `Ref`/`Decl`
    /// is not found in any enclosing function's locals (spec §4.6/§4.8).
    pub global: ObjectHandle,
}

/// Global object capacity: generous enough for any realistic top-level
/// program; exceeding it is a fatal heap-exhaustion style error, not a
/// silent truncation (spec's "everything fatal" stance, §7).
const GLOBAL_OBJECT_SLOTS: u32 = 1024;

impl Vm {
    pub fn new() -> Result<Self, HeapError> {
        let heap = Heap::new();
        let mut shapes = ShapeTable::new();
        let string_shape = shapes.register_fixed_kind();
        let array_shape = shapes.register_fixed_kind();
        let global = object::alloc(&heap, GLOBAL_OBJECT_SLOTS, ShapeTable::ROOT)?;
        Ok(Vm {
            heap,
            strings: Interner::new(),
            shapes,
            string_shape,
            array_shape,
            global,
        })
    }

    pub fn intern(&mut self, text: &str) -> Result<LStrHandle, HeapError> {
        self.strings.intern(&self.heap, text, self.string_shape.0)
    }

    pub fn alloc_array(&self, capacity: u32) -> Result<LArrayHandle, HeapError> {
        array::alloc(&self.heap, capacity, self.array_shape.0)
    }

    pub fn alloc_array_from(&self, items: &[Value]) -> Result<LArrayHandle, HeapError> {
        array::alloc_from(&self.heap, items, self.array_shape.0)
    }

    /// Read a binding from the global object by its interned name.
    pub fn global_get(&self, name: &LStrHandle) -> Option<Value> {
        // SAFETY: `global` and `shapes` belong to this Vm.
        unsafe { self.global.get(&self.heap, &self.shapes, name.addr) }
    }

    /// Write (or create) a global binding.
    pub fn global_set(&mut self, name: &LStrHandle, value: Value) -> Result<(), ObjectError> {
        // SAFETY: `global` and `shapes` belong to this Vm.
        unsafe {
            self.global.set(&self.heap, &mut self.shapes, name.addr, value.tag(), PropAttrs::NONE, value)
        }
    }
}
