//! Lexer, recursive-descent/precedence-climbing parser and AST node
//! shapes for the Loom language core (spec §3 "AST nodes", §4.5
//! "Parser").

pub mod ast;
pub mod error;
pub mod input;
pub mod opinfo;
pub mod parser;

pub use ast::{AstArena, BinOpNode, CallNode, DeclNode, FunNode, IfNode, Node, RefNode, UnOpNode};
pub use error::ParseError;
pub use input::{Input, SrcPos};
pub use opinfo::OpInfo;
pub use parser::parse_unit;
