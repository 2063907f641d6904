//! A convenience driver combining parse, resolve and evaluate in one
//! call, used by `loom-cli` and by this crate's own integration tests.

use loom_heap::{HeapError, Vm};
use loom_syntax::{parse_unit, AstArena, ParseError};

use crate::error::{Fatal, ResolveError};
use crate::eval::Interpreter;
use crate::resolver::var_res_pass;

#[derive(Debug)]
pub enum RunError {
    Heap(HeapError),
    Parse(ParseError),
    Resolve(ResolveError),
    Eval(Fatal),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Heap(e) => write!(f, "{e}"),
            RunError::Parse(e) => write!(f, "{e}"),
            RunError::Resolve(e) => write!(f, "{e}"),
            RunError::Eval(e) => write!(f, "fatal: {e}"),
        }
    }
}
impl std::error::Error for RunError {}

/// Parse, resolve and evaluate `source`, returning the canonical-form
/// string of the program's final value. Any `println` calls along the
/// way write directly to stdout as they happen.
pub fn run_source(source: &str) -> Result<String, RunError> {
    let arena = AstArena::new();
    let mut vm = Vm::new().map_err(RunError::Heap)?;
    let unit = parse_unit(source, &arena, &mut vm).map_err(RunError::Parse)?;
    var_res_pass(unit, None).map_err(RunError::Resolve)?;
    let mut interp = Interpreter::new(&mut vm).map_err(RunError::Eval)?;
    let value = interp.eval_unit(unit).map_err(RunError::Eval)?;
    Ok(interp.canonical_form(value))
}
