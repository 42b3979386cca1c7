//! Syntax tree, parser and printer for BUILD files.
//!
//! The parser reads the Starlark expression grammar found in BUILD files: calls, assignments,
//! literals, lists, tuples, dicts, comprehensions, unary and binary operators, attribute access,
//! indexing, slicing, conditional expressions and lambdas. Statements outside that set (`def`,
//! `for`, augmented assignments) are carried as verbatim text. Comments are attached to
//! statements, arguments, list elements and dict entries so hand edits survive a
//! read/merge/print cycle.
//!
//! The printer follows buildifier's layout for these constructs, so `print(parse(print(f)))`
//! equals `print(f)`.

mod ast;
mod error;
mod lex;
mod parse;
mod print;

pub use ast::{
    Arg, BinaryOp, Call, Clause, Comments, Comprehension, Conditional, Dict, DictEntry, Expr, File,
    Lambda, List, ListItem, Slice, Stmt, StmtKind, UnaryOp,
};
pub use error::ParseError;
pub use parse::parse;
pub use print::print;

/// Comment text marking an element as hand-maintained.
pub const KEEP_MARKER: &str = "keep";
