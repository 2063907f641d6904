//! Resolution- and evaluation-time error types (spec §4.6/§4.7, §7
//! "Error propagation"). Every one of these is fatal: there is no
//! recoverable-error value in the language itself, only process-level
//! failure, so callers propagate with `?` up to `loom-cli`'s exit code.

use loom_heap::{ArrayError, HeapError, ObjectError};

/// The fixed per-function local-variable budget (spec §7, "Limits").
pub const MAX_LOCALS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    TooManyLocals { attempted: usize, max: usize },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::TooManyLocals { attempted, max } => {
                write!(f, "too many locals in one function: {attempted} exceeds the limit of {max}")
            }
        }
    }
}
impl std::error::Error for ResolveError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    Heap(HeapError),
    Array(ArrayError),
    Object(ObjectError),
    /// A test position (`if`, `not`) received a non-`Bool` value.
    NonBooleanCondition,
    /// A `Call`'s callee did not evaluate to a `Closure`.
    CallTargetNotClosure,
    ArityMismatch { expected: usize, found: usize },
    /// A global was read before ever being written.
    UnknownGlobal,
    DivisionByZero,
    /// `[` was applied to a non-`Array` value.
    IndexTargetNotArray,
    /// The left-hand side of `=` was neither a fresh `Decl` nor a `Ref`
    /// resolved as captured or global (spec §4.7: reassigning a plain,
    /// uncaptured local by bare identifier has no evaluator case).
    InvalidAssignTarget,
    UnaryOperandNotInt,
}

impl std::fmt::Display for Fatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fatal::Heap(e) => write!(f, "{e}"),
            Fatal::Array(e) => write!(f, "{e}"),
            Fatal::Object(e) => write!(f, "{e}"),
            Fatal::NonBooleanCondition => write!(f, "expected a boolean in test position"),
            Fatal::CallTargetNotClosure => write!(f, "call target is not a function"),
            Fatal::ArityMismatch { expected, found } => {
                write!(f, "expected {expected} argument(s), found {found}")
            }
            Fatal::UnknownGlobal => write!(f, "reference to an undeclared global"),
            Fatal::DivisionByZero => write!(f, "division by zero"),
            Fatal::IndexTargetNotArray => write!(f, "index target is not an array"),
            Fatal::InvalidAssignTarget => write!(f, "invalid assignment target"),
            Fatal::UnaryOperandNotInt => write!(f, "unary - requires an integer operand"),
        }
    }
}
impl std::error::Error for Fatal {}

impl From<HeapError> for Fatal {
    fn from(e: HeapError) -> Self {
        Fatal::Heap(e)
    }
}
impl From<ArrayError> for Fatal {
    fn from(e: ArrayError) -> Self {
        Fatal::Array(e)
    }
}
impl From<ObjectError> for Fatal {
    fn from(e: ObjectError) -> Self {
        Fatal::Object(e)
    }
}
