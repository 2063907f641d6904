//! The parser accept/reject pairs from spec §8, exercised as crate-
//! level integration tests rather than inline unit tests since they
//! describe externally observable grammar behavior.

use loom_heap::Vm;
use loom_syntax::{parse_unit, AstArena};

fn accepts(source: &str) -> bool {
    let arena = AstArena::new();
    let mut vm = Vm::new().unwrap();
    parse_unit(source, &arena, &mut vm).is_ok()
}

#[test]
fn accepts_a_recursive_function_definition() {
    assert!(accepts("fib = fun (n) if n < 2 then n else fib(n-1) + fib(n-2)"));
}

#[test]
fn rejects_array_literal_with_only_a_comma() {
    assert!(!accepts("[,]"));
}

#[test]
fn rejects_call_with_missing_argument_separator() {
    assert!(!accepts("a(b c+1)"));
}

#[test]
fn rejects_if_missing_its_then_branch() {
    assert!(!accepts("if x then a if"));
}

#[test]
fn rejects_fun_with_no_body_expression() {
    assert!(!accepts("fun (x,y)"));
}

#[test]
fn rejects_dangling_close_comment_after_a_closed_block_comment() {
    assert!(!accepts("1 /* */ */"));
}

#[test]
fn accepts_every_literal_end_to_end_scenario_input() {
    for src in [
        "0",
        "3 + 2 * 5",
        "-(7 + 3)",
        "0xFF",
        "0b101",
        "not not true",
        "'foo' == 'foo'",
        "'f' != 'b'",
        "[0,1,2][0]",
        "[7+3][0]",
        "{ 2 3+7 }",
        "if 0 < 10 then 7 else 3",
        "(var x = 3) x",
        "(let x = 7) x + 1",
        "(let f = fun (n) n) f(8)",
        "(let f = fun () 7) f()",
    ] {
        assert!(accepts(src), "expected {src:?} to parse");
    }
}
