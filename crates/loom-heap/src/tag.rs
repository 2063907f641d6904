//! The tagged value pair: every Loom runtime value is a 16-byte
//! `(word, tag)` pair, never a packed/NaN-boxed representation.

/// Discriminant for [`Value`]. Mirrors `original_source/source/vm.h`'s
/// `tag_t`, with `RunError` kept for taxonomy parity even though the core
/// evaluator never produces it (everything fatal is a process abort, not
/// a value).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Bool = 0,
    Int64 = 1,
    Float64 = 2,
    String = 3,
    Array = 4,
    RawPtr = 5,
    Object = 6,
    Closure = 7,
    RunError = 8,
}

/// A tagged value: one 64-bit word plus a tag byte. Two values are equal
/// iff both the tag and the raw word bits match — this is bit-identical
/// equality, not `==` on the decoded payload (so `0.0f64` and `-0.0f64`
/// differ, matching `original_source`'s word-for-word comparison).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Value {
    word: u64,
    tag: Tag,
}

impl Value {
    pub fn bool(b: bool) -> Self {
        Value { word: b as u64, tag: Tag::Bool }
    }

    pub fn int(i: i64) -> Self {
        Value { word: i as u64, tag: Tag::Int64 }
    }

    pub fn float(f: f64) -> Self {
        Value { word: f.to_bits(), tag: Tag::Float64 }
    }

    /// A pointer-tagged value. `addr` is the heap address of the pointee;
    /// `tag` must be one of `String`, `Array`, `Object`, `Closure` or
    /// `RawPtr`.
    pub fn ptr(addr: u64, tag: Tag) -> Self {
        debug_assert!(matches!(
            tag,
            Tag::String | Tag::Array | Tag::Object | Tag::Closure | Tag::RawPtr
        ));
        Value { word: addr, tag }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn raw_word(&self) -> u64 {
        self.word
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.tag, Tag::Bool)
    }

    pub fn is_int(&self) -> bool {
        matches!(self.tag, Tag::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self.tag, Tag::Float64)
    }

    /// Panics if the tag is not `Bool`; callers are expected to check
    /// `tag()` first (the evaluator's strict-bool rule turns a mismatch
    /// into a fatal evaluation error before this is ever called).
    pub fn as_bool(&self) -> bool {
        debug_assert!(self.is_bool());
        self.word != 0
    }

    pub fn as_int(&self) -> i64 {
        debug_assert!(self.is_int());
        self.word as i64
    }

    pub fn as_float(&self) -> f64 {
        debug_assert!(self.is_float());
        f64::from_bits(self.word)
    }

    /// The heap address carried by a pointer-tagged value (`String`,
    /// `Array`, `Object`, `Closure`, `RawPtr`). Zero means "null".
    pub fn as_addr(&self) -> u64 {
        self.word
    }

    pub fn is_null_ptr(&self) -> bool {
        self.word == 0
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tag {
            Tag::Bool => write!(f, "Bool({})", self.as_bool()),
            Tag::Int64 => write!(f, "Int64({})", self.as_int()),
            Tag::Float64 => write!(f, "Float64({})", self.as_float()),
            Tag::String => write!(f, "String(@{:#x})", self.word),
            Tag::Array => write!(f, "Array(@{:#x})", self.word),
            Tag::RawPtr => write!(f, "RawPtr({:#x})", self.word),
            Tag::Object => write!(f, "Object(@{:#x})", self.word),
            Tag::Closure => write!(f, "Closure(@{:#x})", self.word),
            Tag::RunError => write!(f, "RunError"),
        }
    }
}

/// Bit-identical equality: same tag, same raw word.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.word == other.word
    }
}
impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    /// The data model (spec §3) requires the pair to be exactly 16
    /// bytes: an 8-byte word plus a 1-byte tag, padded to alignment.
    /// Mirrors the teacher's `test_value_layout` in `runtime/src/value.rs`.
    #[test]
    fn test_value_layout() {
        assert_eq!(std::mem::size_of::<Value>(), 16);
        assert_eq!(std::mem::align_of::<Value>(), 8);
    }

    #[test]
    fn test_int_roundtrip() {
        let v = Value::int(-42);
        assert_eq!(v.tag(), Tag::Int64);
        assert_eq!(v.as_int(), -42);
    }

    #[test]
    fn test_bool_word_is_zero_or_one() {
        assert_eq!(Value::bool(true).raw_word(), 1);
        assert_eq!(Value::bool(false).raw_word(), 0);
    }

    #[test]
    fn test_negative_zero_differs_bitwise() {
        let pos = Value::float(0.0);
        let neg = Value::float(-0.0);
        assert_ne!(pos, neg, "word-for-word equality must see the sign bit");
    }

    #[test]
    fn test_equality_requires_matching_tag() {
        // Same bit pattern, different tag: must not compare equal.
        let as_int = Value::int(1);
        let as_bool = Value::bool(true);
        assert_ne!(as_int, as_bool);
    }
}
