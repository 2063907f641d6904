//! Recursive-descent atoms plus a precedence-climbing operator loop
//! (spec §4.5), grounded on `original_source/source/parser.c`'s
//! `parseAtom`/`parseExpr`/`parseExprList` family — that file only
//! sketches `parseIdent`/`parseInt`/`parseStr`/`parseExprList` and
//! leaves `parseExpr` a `TODO`, so the operator loop itself is built
//! from §4.5's precedence table and the teacher's own `Parser`-struct-
//! with-`Result<_, String>` idiom (`compiler/src/parser.rs`).

use loom_heap::{Value, Vm};

use crate::ast::{AstArena, BinOpNode, CallNode, FunNode, IfNode, Node, UnOpNode};
use crate::error::ParseError;
use crate::input::{Input, SrcPos};
use crate::opinfo::{self, OpInfo, OP_ASSIGN, OP_INDEX, OP_MEMBER, OP_NEG, OP_NOT};

/// Parse a complete source unit: zero or more top-level expressions,
/// wrapped in an anonymous zero-parameter `Fun` whose body is their
/// `Seq` (spec §4.5 "Unit").
pub fn parse_unit<'a>(
    source: &str,
    arena: &'a AstArena,
    vm: &mut Vm,
) -> Result<&'a Node<'a>, ParseError> {
    let mut parser = Parser { input: Input::new(source), arena, vm };
    parser.eat_ws()?;

    let mut exprs = Vec::new();
    while !parser.input.eof() {
        exprs.push(parser.parse_expr(0)?);
        parser.eat_ws()?;
    }
    if exprs.is_empty() {
        return Err(parser.error("empty program: a unit must contain at least one expression"));
    }

    let body = arena.alloc(Node::Seq(arena.alloc_vec(exprs)));
    Ok(arena.alloc(Node::Fun(FunNode {
        params: &[],
        body,
        parent: std::cell::Cell::new(None),
        locals: std::cell::RefCell::new(Vec::new()),
        captures: std::cell::RefCell::new(Vec::new()),
    })))
}

struct Parser<'a, 'v> {
    input: Input,
    arena: &'a AstArena,
    vm: &'v mut Vm,
}

/// What the infix-position operator scan found waiting at the cursor.
enum OpMatch {
    Call,
    Index,
    Member,
    Binary(&'static OpInfo),
}

impl<'a, 'v> Parser<'a, 'v> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.input.pos(), message)
    }

    fn error_at(&self, pos: SrcPos, message: impl Into<String>) -> ParseError {
        let err = ParseError { message: message.into(), pos };
        tracing::debug!(pos = %err.pos, message = %err.message, "parse error");
        err
    }

    /// `Input::eat_ws` wrapper that turns an unterminated block comment
    /// into a `ParseError` pointing at the comment's opening `/*`
    /// (spec §7: "unterminated strings/comments" is a lex/parse error,
    /// the same as the unterminated-string case in `try_string`).
    fn eat_ws(&mut self) -> Result<(), ParseError> {
        self.input.eat_ws().map_err(|start| self.error_at(start, "unterminated block comment"))
    }

    fn intern(&mut self, text: &str) -> Result<loom_heap::LStrHandle, ParseError> {
        self.vm.intern(text).map_err(|e| self.error(e.to_string()))
    }

    // ---- expression entry point: precedence climbing ----

    fn parse_expr(&mut self, min_prec: u8) -> Result<&'a Node<'a>, ParseError> {
        let mut lhs = self.parse_atom()?;
        loop {
            self.eat_ws()?;
            match self.try_match_operator(min_prec) {
                None => break,
                Some(OpMatch::Call) => {
                    let args = self.parse_arg_list()?;
                    lhs = self.arena.alloc(Node::Call(CallNode {
                        callee: lhs,
                        args: self.arena.alloc_vec(args),
                    }));
                }
                Some(OpMatch::Index) => {
                    self.eat_ws()?;
                    let idx = self.parse_expr(0)?;
                    self.eat_ws()?;
                    if !self.input.match_ch(']') {
                        return Err(self.error("expected ']' to close index expression"));
                    }
                    lhs = self.arena.alloc(Node::BinOp(BinOpNode { op: &OP_INDEX, lhs, rhs: idx }));
                }
                Some(OpMatch::Member) => {
                    self.eat_ws()?;
                    let name = self.expect_ident("expected property name after '.'")?;
                    let rhs = self.arena.alloc(Node::Str(name));
                    lhs = self.arena.alloc(Node::BinOp(BinOpNode { op: &OP_MEMBER, lhs, rhs }));
                }
                Some(OpMatch::Binary(op)) => {
                    self.eat_ws()?;
                    let next_min = if op.right_assoc { op.prec } else { op.prec + 1 };
                    let rhs = self.parse_expr(next_min)?;
                    lhs = self.arena.alloc(Node::BinOp(BinOpNode { op, lhs, rhs }));
                    if op.nonassoc {
                        // A nonassoc operator may not be immediately
                        // followed, at this same precedence tier, by
                        // another operator (spec §4.5): `a - b - c` and
                        // `a / b / c` are errors. Checked right here,
                        // against `op`'s own precedence only, so a
                        // *lower*-precedence operator further on (`a / b
                        // < c`) is left for this same loop's next
                        // iteration to pick up normally.
                        self.eat_ws()?;
                        if self.peeks_operator_at_precedence(op.prec) {
                            return Err(self.error(format!(
                                "'{}' is non-associative and cannot be chained with another operator of the same precedence",
                                op.spelling
                            )));
                        }
                    }
                }
            }
        }
        Ok(lhs)
    }

    /// Non-consuming check: does an infix-position operator with
    /// `prec == target` sit at the cursor? Used only to detect a
    /// disallowed nonassoc chain without committing the match (the real
    /// match, if the check passes, happens on this same loop's next
    /// iteration via `try_match_operator`).
    fn peeks_operator_at_precedence(&self, target: u8) -> bool {
        let mut probe = self.input.clone();
        match probe.peek_ch() {
            Some('(') if opinfo::OP_CALL.prec == target => return true,
            Some('[') if opinfo::OP_INDEX.prec == target => return true,
            Some('.') if opinfo::OP_MEMBER.prec == target => return true,
            _ => {}
        }
        for op in opinfo::symbol_ops() {
            if op.arity == 2 && op.prec == target && probe.match_str(op.spelling) {
                return true;
            }
        }
        for op in opinfo::keyword_ops() {
            if op.arity == 2 && op.prec == target && probe.match_keyword(op.spelling) {
                return true;
            }
        }
        false
    }

    /// Peek for an infix-position operator with `prec >= min_prec` and
    /// consume its spelling if found. Matched forms (`(`, `[`, `.`) are
    /// tried first since they key off a single punctuation character;
    /// symbolic operators are tried longest-spelling-first so `==`/`<=`
    /// etc. aren't shadowed by their single-character prefixes; keyword
    /// operators use `match_keyword` for a word-boundary check. `not` is
    /// prefix-only and is excluded here.
    fn try_match_operator(&mut self, min_prec: u8) -> Option<OpMatch> {
        match self.input.peek_ch() {
            Some('(') if opinfo::OP_CALL.prec >= min_prec => {
                self.input.match_ch('(');
                return Some(OpMatch::Call);
            }
            Some('[') if opinfo::OP_INDEX.prec >= min_prec => {
                self.input.match_ch('[');
                return Some(OpMatch::Index);
            }
            Some('.') if opinfo::OP_MEMBER.prec >= min_prec => {
                self.input.match_ch('.');
                return Some(OpMatch::Member);
            }
            _ => {}
        }
        for op in opinfo::symbol_ops() {
            if op.arity == 2 && op.prec >= min_prec && self.input.match_str(op.spelling) {
                return Some(OpMatch::Binary(op));
            }
        }
        for op in opinfo::keyword_ops() {
            if op.arity == 2 && op.prec >= min_prec && self.input.match_keyword(op.spelling) {
                return Some(OpMatch::Binary(op));
            }
        }
        None
    }

    fn parse_arg_list(&mut self) -> Result<Vec<&'a Node<'a>>, ParseError> {
        let mut args = Vec::new();
        self.eat_ws()?;
        if self.input.match_ch(')') {
            return Ok(args);
        }
        loop {
            self.eat_ws()?;
            args.push(self.parse_expr(0)?);
            self.eat_ws()?;
            if self.input.match_ch(',') {
                self.eat_ws()?;
                if self.input.match_ch(')') {
                    break;
                }
                continue;
            }
            if self.input.match_ch(')') {
                break;
            }
            return Err(self.error("expected ',' or ')' in argument list"));
        }
        Ok(args)
    }

    // ---- atoms ----

    fn parse_atom(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.eat_ws()?;
        if let Some(node) = self.try_number()? {
            return Ok(node);
        }
        if let Some(node) = self.try_string()? {
            return Ok(node);
        }
        if let Some(node) = self.try_array_lit()? {
            return Ok(node);
        }
        if let Some(node) = self.try_paren()? {
            return Ok(node);
        }
        if let Some(node) = self.try_seq()? {
            return Ok(node);
        }
        if let Some(node) = self.try_prefix_unary()? {
            return Ok(node);
        }
        if let Some(node) = self.try_var_decl()? {
            return Ok(node);
        }
        if let Some(node) = self.try_let_decl()? {
            return Ok(node);
        }
        if let Some(node) = self.try_if()? {
            return Ok(node);
        }
        if let Some(node) = self.try_fun()? {
            return Ok(node);
        }
        if self.input.match_keyword("true") {
            return Ok(self.arena.alloc(Node::Const(Value::bool(true))));
        }
        if self.input.match_keyword("false") {
            return Ok(self.arena.alloc(Node::Const(Value::bool(false))));
        }
        if let Some(node) = self.try_ident_ref()? {
            return Ok(node);
        }
        Err(self.error("expected an expression"))
    }

    fn try_number(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        let mut probe = self.input.clone();
        if probe.match_str("0x") {
            let digits = read_while(&mut probe, |c| c.is_ascii_hexdigit());
            if digits.is_empty() {
                return Err(self.error("expected hex digits after '0x'"));
            }
            let val = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.error("hex literal out of range"))?;
            self.input = probe;
            return Ok(Some(self.arena.alloc(Node::Const(Value::int(val)))));
        }
        if probe.match_str("0b") {
            let digits = read_while(&mut probe, |c| c == '0' || c == '1');
            if digits.is_empty() {
                return Err(self.error("expected binary digits after '0b'"));
            }
            let val = i64::from_str_radix(&digits, 2)
                .map_err(|_| self.error("binary literal out of range"))?;
            self.input = probe;
            return Ok(Some(self.arena.alloc(Node::Const(Value::int(val)))));
        }
        let digits = read_while(&mut probe, |c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(None);
        }
        let val: i64 = digits.parse().map_err(|_| self.error("integer literal out of range"))?;
        self.input = probe;
        Ok(Some(self.arena.alloc(Node::Const(Value::int(val)))))
    }

    fn try_string(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        let quote = match self.input.peek_ch() {
            Some(c @ '\'') | Some(c @ '"') => c,
            _ => return Ok(None),
        };
        let mut probe = self.input.clone();
        probe.read_ch();
        let mut text = String::new();
        loop {
            match probe.read_ch() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => break,
                Some('\\') => match probe.read_ch() {
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('0') => text.push('\0'),
                    Some(other) => {
                        return Err(self.error(format!("unknown escape sequence '\\{other}'")))
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => text.push(c),
            }
        }
        self.input = probe;
        let handle = self.intern(&text)?;
        Ok(Some(self.arena.alloc(Node::Str(handle))))
    }

    fn try_array_lit(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_ch('[') {
            return Ok(None);
        }
        self.eat_ws()?;
        let mut items = Vec::new();
        if self.input.match_ch(']') {
            return Ok(Some(self.arena.alloc(Node::ArrayLit(self.arena.alloc_vec(items)))));
        }
        loop {
            self.eat_ws()?;
            items.push(self.parse_expr(0)?);
            self.eat_ws()?;
            if self.input.match_ch(',') {
                self.eat_ws()?;
                if self.input.match_ch(']') {
                    break;
                }
                continue;
            }
            if self.input.match_ch(']') {
                break;
            }
            return Err(self.error("expected ',' or ']' in array literal"));
        }
        Ok(Some(self.arena.alloc(Node::ArrayLit(self.arena.alloc_vec(items)))))
    }

    fn try_paren(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_ch('(') {
            return Ok(None);
        }
        self.eat_ws()?;
        let inner = self.parse_expr(0)?;
        self.eat_ws()?;
        if !self.input.match_ch(')') {
            return Err(self.error("expected ')'"));
        }
        Ok(Some(inner))
    }

    fn try_seq(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_ch('{') {
            return Ok(None);
        }
        let mut exprs = Vec::new();
        loop {
            self.eat_ws()?;
            if self.input.match_ch('}') {
                break;
            }
            exprs.push(self.parse_expr(0)?);
        }
        if exprs.is_empty() {
            return Err(self.error("empty block '{}' is not a legal sequence"));
        }
        Ok(Some(self.arena.alloc(Node::Seq(self.arena.alloc_vec(exprs)))))
    }

    fn try_prefix_unary(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if self.input.match_ch('-') {
            self.eat_ws()?;
            let expr = self.parse_atom()?;
            return Ok(Some(self.arena.alloc(Node::UnOp(UnOpNode { op: &OP_NEG, expr }))));
        }
        if self.input.match_keyword("not") {
            self.eat_ws()?;
            let expr = self.parse_atom()?;
            return Ok(Some(self.arena.alloc(Node::UnOp(UnOpNode { op: &OP_NOT, expr }))));
        }
        Ok(None)
    }

    fn try_var_decl(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_keyword("var") {
            return Ok(None);
        }
        self.eat_ws()?;
        let name = self.expect_ident("expected identifier after 'var'")?;
        Ok(Some(self.arena.alloc(Node::new_decl(name, false))))
    }

    fn try_let_decl(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_keyword("let") {
            return Ok(None);
        }
        self.eat_ws()?;
        let name = self.expect_ident("expected identifier after 'let'")?;
        self.eat_ws()?;
        if !self.input.match_ch('=') {
            return Err(self.error("expected '=' after 'let <name>'"));
        }
        self.eat_ws()?;
        let rhs = self.parse_expr(0)?;
        let decl = self.arena.alloc(Node::new_decl(name, true));
        Ok(Some(self.arena.alloc(Node::BinOp(BinOpNode { op: &OP_ASSIGN, lhs: decl, rhs }))))
    }

    fn try_if(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_keyword("if") {
            return Ok(None);
        }
        self.eat_ws()?;
        let test = self.parse_expr(0)?;
        self.eat_ws()?;
        if !self.input.match_keyword("then") {
            return Err(self.error("expected 'then' after 'if' condition"));
        }
        self.eat_ws()?;
        let then_branch = self.parse_expr(0)?;
        self.eat_ws()?;
        let else_branch = if self.input.match_keyword("else") {
            self.eat_ws()?;
            self.parse_expr(0)?
        } else {
            self.arena.alloc(Node::Const(Value::bool(false)))
        };
        Ok(Some(self.arena.alloc(Node::If(IfNode { test, then_branch, else_branch }))))
    }

    fn try_fun(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        if !self.input.match_keyword("fun") {
            return Ok(None);
        }
        self.eat_ws()?;
        if !self.input.match_ch('(') {
            return Err(self.error("expected '(' after 'fun'"));
        }
        let params = self.parse_param_list()?;
        self.eat_ws()?;
        let body = self.parse_expr(0)?;
        Ok(Some(self.arena.alloc(Node::Fun(FunNode {
            params: self.arena.alloc_vec(params),
            body,
            parent: std::cell::Cell::new(None),
            locals: std::cell::RefCell::new(Vec::new()),
            captures: std::cell::RefCell::new(Vec::new()),
        }))))
    }

    fn parse_param_list(&mut self) -> Result<Vec<&'a Node<'a>>, ParseError> {
        let mut params = Vec::new();
        self.eat_ws()?;
        if self.input.match_ch(')') {
            return Ok(params);
        }
        loop {
            self.eat_ws()?;
            let name = self.expect_ident("expected parameter name")?;
            params.push(self.arena.alloc(Node::new_decl(name, false)));
            self.eat_ws()?;
            if self.input.match_ch(',') {
                self.eat_ws()?;
                if self.input.match_ch(')') {
                    break;
                }
                continue;
            }
            if self.input.match_ch(')') {
                break;
            }
            return Err(self.error("expected ',' or ')' in parameter list"));
        }
        Ok(params)
    }

    fn try_ident_ref(&mut self) -> Result<Option<&'a Node<'a>>, ParseError> {
        let mut probe = self.input.clone();
        let text = read_ident(&mut probe);
        if text.is_empty() {
            return Ok(None);
        }
        self.input = probe;
        let handle = self.intern(&text)?;
        Ok(Some(self.arena.alloc(Node::new_ref(handle))))
    }

    fn expect_ident(&mut self, message: &str) -> Result<loom_heap::LStrHandle, ParseError> {
        let mut probe = self.input.clone();
        let text = read_ident(&mut probe);
        if text.is_empty() {
            return Err(self.error(message));
        }
        self.input = probe;
        self.intern(&text)
    }
}

fn read_while(input: &mut Input, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(c) = input.peek_ch() {
        if !pred(c) {
            break;
        }
        out.push(c);
        input.read_ch();
    }
    out
}

/// `[A-Za-z_$][A-Za-z0-9_$]*` (spec §6 "Lexical surface").
fn read_ident(input: &mut Input) -> String {
    let mut out = String::new();
    match input.peek_ch() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            out.push(c);
            input.read_ch();
        }
        _ => return out,
    }
    while let Some(c) = input.peek_ch() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            out.push(c);
            input.read_ch();
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_heap::Vm;

    fn parse(src: &str) -> Result<(), ParseError> {
        let arena = AstArena::new();
        let mut vm = Vm::new().unwrap();
        parse_unit(src, &arena, &mut vm)?;
        Ok(())
    }

    #[test]
    fn test_accepts_fib_definition() {
        parse("fib = fun (n) if n < 2 then n else fib(n-1) + fib(n-2)").unwrap();
    }

    #[test]
    fn test_rejects_empty_array_with_leading_comma() {
        assert!(parse("[,]").is_err());
    }

    #[test]
    fn test_rejects_missing_comma_between_call_args() {
        assert!(parse("a(b c+1)").is_err());
    }

    #[test]
    fn test_rejects_trailing_dangling_if() {
        assert!(parse("if x then a if").is_err());
    }

    #[test]
    fn test_rejects_fun_with_no_body() {
        assert!(parse("fun (x,y)").is_err());
    }

    #[test]
    fn test_rejects_unterminated_block_comment_artifact() {
        // the trailing "*/" here is dangling source text after the (non-nested)
        // comment already closed at the first "*/", so it parses as two stray
        // tokens with nothing between them -- not a valid unit.
        assert!(parse("1 /* */ */").is_err());
    }

    #[test]
    fn test_precedence_climbing_multiplication_binds_tighter() {
        let arena = AstArena::new();
        let mut vm = Vm::new().unwrap();
        let unit = parse_unit("3 + 2 * 5", &arena, &mut vm).unwrap();
        let fun = unit.as_fun().unwrap();
        match fun.body {
            Node::Seq(exprs) => {
                assert_eq!(exprs.len(), 1);
                match exprs[0] {
                    Node::BinOp(b) => assert_eq!(b.op.spelling, "+"),
                    _ => panic!("expected top-level '+'"),
                }
            }
            _ => panic!("expected Seq body"),
        }
    }

    #[test]
    fn test_let_produces_assign_of_const_decl() {
        let arena = AstArena::new();
        let mut vm = Vm::new().unwrap();
        let unit = parse_unit("let x = 7", &arena, &mut vm).unwrap();
        let fun = unit.as_fun().unwrap();
        if let Node::Seq(exprs) = fun.body {
            if let Node::BinOp(b) = exprs[0] {
                assert_eq!(b.op.spelling, "=");
                assert!(b.lhs.as_decl().unwrap().is_const);
            } else {
                panic!("expected BinOp(Assign, ...)");
            }
        }
    }

    #[test]
    fn test_string_escape_rejects_unknown_sequence() {
        assert!(parse(r"'\q'").is_err());
    }

    #[test]
    fn test_hex_and_binary_literals() {
        parse("0xFF").unwrap();
        parse("0b101").unwrap();
    }

    #[test]
    fn test_relational_comparison_can_chain() {
        // spec §4.5's precedence table marks `<`/`<=`/`>`/`>=` plain `L`,
        // unlike `/`/`mod`/binary `-` which are `L-nonassoc`.
        parse("a < b < c").unwrap();
    }

    #[test]
    fn test_nonassoc_div_cannot_chain_but_mul_can() {
        assert!(parse("a / b / c").is_err());
        parse("a * b * c").unwrap();
    }

    #[test]
    fn test_nonassoc_sub_cannot_chain_at_top_level() {
        // `-` is `L-nonassoc` (spec §4.5). `a - b - c` must be rejected
        // as a single expression, not silently split into the two
        // top-level statements `a - b` and `-c` (the leftover `- c`
        // would otherwise be re-parsed as a fresh unary negation by
        // `try_prefix_unary`).
        assert!(parse("a - b - c").is_err());
        assert!(parse("(a - b - c)").is_err());
    }

    #[test]
    fn test_nonassoc_sub_does_not_block_a_lower_precedence_operator() {
        // a nonassoc operator only blocks another operator at its own
        // precedence tier; a strictly lower-precedence operator right
        // after it is a different concern and must still parse.
        parse("a / b < c").unwrap();
    }

    #[test]
    fn test_rejects_unterminated_block_comment() {
        assert!(parse("1 /* oops").is_err());
        assert!(parse("/* never closed").is_err());
    }
}
