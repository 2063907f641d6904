//! Operator descriptors (spec §4.5). AST nodes store a `&'static OpInfo`
//! pointer rather than an enum tag, and the evaluator dispatches by
//! pointer identity (`std::ptr::eq`) — the same technique
//! `original_source/source/parser.h`'s `opinfo_t` table uses in C
//! (`binop->op == &OP_ADD`).

#[derive(Debug)]
pub struct OpInfo {
    /// Operator spelling as it appears in source (`"+"`, `"and"`, ...).
    pub spelling: &'static str,
    /// 1 for prefix unary operators, 2 for binary/postfix operators.
    pub arity: u8,
    /// Binding power; higher binds tighter.
    pub prec: u8,
    pub right_assoc: bool,
    /// Non-associative operators (comparisons, equality) cannot be
    /// chained: `a < b < c` is a parse error, not `(a < b) < c`.
    pub nonassoc: bool,
}

macro_rules! op {
    ($name:ident, $spelling:expr, $arity:expr, $prec:expr, $right:expr, $nonassoc:expr) => {
        pub static $name: OpInfo = OpInfo {
            spelling: $spelling,
            arity: $arity,
            prec: $prec,
            right_assoc: $right,
            nonassoc: $nonassoc,
        };
    };
}

// Postfix, tightest-binding.
op!(OP_MEMBER, ".", 2, 16, false, false);
op!(OP_INDEX, "[", 2, 16, false, false);
op!(OP_CALL, "(", 2, 15, false, false);

// Prefix unary.
op!(OP_NEG, "-", 1, 13, false, false);
op!(OP_NOT, "not", 1, 13, false, false);

// Multiplicative.
op!(OP_MUL, "*", 2, 12, false, false);
op!(OP_DIV, "/", 2, 12, false, true);
op!(OP_MOD, "mod", 2, 12, false, true);

// Additive.
op!(OP_ADD, "+", 2, 11, false, false);
op!(OP_SUB, "-", 2, 11, false, true);

// Relational: left-associative, chainable (spec §4.5's precedence
// table marks only `/`, `mod` and binary `-` as `L-nonassoc`; these are
// plain `L`).
op!(OP_LT, "<", 2, 9, false, false);
op!(OP_LE, "<=", 2, 9, false, false);
op!(OP_GT, ">", 2, 9, false, false);
op!(OP_GE, ">=", 2, 9, false, false);
op!(OP_IN, "in", 2, 9, false, false);
op!(OP_INSTANCEOF, "instanceof", 2, 9, false, false);

// Equality: left-associative, chainable.
op!(OP_EQ, "==", 2, 8, false, false);
op!(OP_NE, "!=", 2, 8, false, false);

// Bitwise.
op!(OP_BIT_AND, "&", 2, 7, false, false);
op!(OP_BIT_XOR, "^", 2, 6, false, false);
op!(OP_BIT_OR, "|", 2, 5, false, false);

// Logical.
op!(OP_AND, "and", 2, 4, false, false);
op!(OP_OR, "or", 2, 3, false, false);

// Assignment, right-associative.
op!(OP_ASSIGN, "=", 2, 1, true, false);

// Keyword-spelled operators (`mod`, `in`, `instanceof`, `and`, `or`,
// prefix `not`) must not match a prefix of a longer identifier (`mod`
// inside `module`), so the lexer matches them via `match_keyword` (which
// requires a non-identifier character or EOF to follow), never via the
// plain substring matching used for symbolic operators.
pub fn keyword_ops() -> &'static [&'static OpInfo] {
    &[&OP_MOD, &OP_IN, &OP_INSTANCEOF, &OP_AND, &OP_OR, &OP_NOT]
}

pub fn symbol_ops() -> &'static [&'static OpInfo] {
    &[
        &OP_LE, &OP_GE, &OP_EQ, &OP_NE, &OP_LT, &OP_GT, &OP_ADD, &OP_SUB, &OP_MUL, &OP_DIV,
        &OP_BIT_AND, &OP_BIT_XOR, &OP_BIT_OR, &OP_ASSIGN,
    ]
}
