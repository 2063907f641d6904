//! `loom` — the thin driver binary for the Loom language core.
//!
//! Out of spec-scope per spec §1 ("the file/stdin shell ... is a thin
//! entry-point concern"), but every runnable crate needs one; this is
//! reduced to the single `run <path>` form the core actually needs
//! (REPL/test modes are the explicitly out-of-scope shell), mirroring
//! `crates/compiler/src/main.rs`'s `#[derive(ClapParser)]` CLI shape
//! and `crates/lsp/src/main.rs`'s `tracing-subscriber` logging setup.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use loom_eval::{run_source, RunError};

#[derive(ClapParser)]
#[command(name = "loom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate a Loom source file", long_about = None)]
struct Cli {
    /// Source file to parse, resolve and evaluate
    input: PathBuf,
}

/// Exit codes (spec §6): `0` on clean completion, a distinct non-zero
/// code per fatal class so a calling shell can distinguish a parse
/// failure from a resource failure without scraping stderr text.
const EXIT_OK: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_RESOLVE_ERROR: u8 = 2;
const EXIT_EVAL_ERROR: u8 = 3;
const EXIT_IO_ERROR: u8 = 4;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("loom=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    ExitCode::from(run(&cli.input))
}

/// Read, parse, resolve and evaluate the file at `path`, printing the
/// result (or an error) and returning the process exit code it earns.
fn run(path: &std::path::Path) -> u8 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", path.display());
            return EXIT_IO_ERROR;
        }
    };

    match run_source(&source) {
        Ok(value) => {
            println!("{value}");
            EXIT_OK
        }
        Err(e @ RunError::Heap(_)) => {
            eprintln!("error: {e}");
            EXIT_IO_ERROR
        }
        Err(e @ RunError::Parse(_)) => {
            eprintln!("{e} in {}", path.display());
            EXIT_PARSE_ERROR
        }
        Err(e @ RunError::Resolve(_)) => {
            eprintln!("error: {e}");
            EXIT_RESOLVE_ERROR
        }
        Err(e @ RunError::Eval(_)) => {
            eprintln!("error: {e}");
            EXIT_EVAL_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_clean_program_exits_zero() {
        let file = write_source("3 + 2 * 5");
        assert_eq!(run(file.path()), EXIT_OK);
    }

    #[test]
    fn test_parse_error_exits_with_parse_code() {
        let file = write_source("if x then a if");
        assert_eq!(run(file.path()), EXIT_PARSE_ERROR);
    }

    #[test]
    fn test_missing_file_exits_with_io_code() {
        assert_eq!(run(std::path::Path::new("/nonexistent/does-not-exist.loom")), EXIT_IO_ERROR);
    }

    #[test]
    fn test_eval_fatal_exits_with_eval_code() {
        let file = write_source("if 1 then true else false");
        assert_eq!(run(file.path()), EXIT_EVAL_ERROR);
    }
}
