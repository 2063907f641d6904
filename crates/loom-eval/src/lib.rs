//! Variable resolution and tree-walking evaluation for the Loom
//! language core (spec §4.6 "Variable resolution", §4.7 "Evaluator",
//! §4.8 "println").

pub mod cell;
pub mod closure;
pub mod error;
pub mod eval;
pub mod resolver;
pub mod run;

pub use cell::CellHandle;
pub use closure::ClosureHandle;
pub use error::{Fatal, ResolveError, MAX_LOCALS};
pub use eval::{eval_truth, Frame, Interpreter};
pub use resolver::var_res_pass;
pub use run::{run_source, RunError};
