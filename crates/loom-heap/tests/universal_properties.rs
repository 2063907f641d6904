//! Crate-level integration tests for the two universal properties §8
//! assigns to this layer: intern uniqueness and shape offset
//! monotonicity. Placed under `tests/` the way the teacher places its
//! own cross-module checks in `crates/runtime/tests/test_closures.rs`.

use loom_heap::{PropAttrs, ShapeTable, Tag, Vm};

#[test]
fn intern_uniqueness_holds_across_many_distinct_and_repeated_strings() {
    let mut vm = Vm::new().unwrap();
    let words = ["alpha", "beta", "gamma", "alpha", "delta", "beta", "alpha"];
    let mut handles = Vec::new();
    for w in &words {
        handles.push((*w, vm.intern(w).unwrap()));
    }
    for i in 0..handles.len() {
        for j in 0..handles.len() {
            let (text_a, handle_a) = handles[i];
            let (text_b, handle_b) = handles[j];
            let content_equal = text_a == text_b;
            let pointer_equal = handle_a.addr == handle_b.addr;
            assert_eq!(
                content_equal, pointer_equal,
                "intern({text_a:?}) and intern({text_b:?}) disagree on pointer vs content equality"
            );
        }
    }
}

#[test]
fn shape_offsets_are_monotonic_and_aligned_along_a_long_chain() {
    let mut shapes = ShapeTable::new();
    let field_sizes: [(u8, Tag); 6] =
        [(8, Tag::Int64), (1, Tag::Bool), (8, Tag::Int64), (1, Tag::Bool), (8, Tag::String), (1, Tag::Bool)];

    let mut parent = ShapeTable::ROOT;
    for (i, (size, tag)) in field_sizes.iter().enumerate() {
        let name_addr = 0x1000 + i as u64;
        let child = shapes.child(parent, name_addr, *tag, PropAttrs::NONE, *size);
        let parent_offset = shapes.offset_of(parent);
        let parent_size = shapes.size_of(parent) - parent_offset;
        assert!(
            shapes.offset_of(child) >= parent_offset + parent_size,
            "child offset must not overlap its parent's field"
        );
        assert_eq!(
            shapes.offset_of(child) % (*size as u32).max(1),
            0,
            "field of size {size} must start on a {size}-aligned offset"
        );
        parent = child;
    }
}
