//! # duality-syntax
//!
//! The surface layer of duality: a backtracking recursive-descent parser
//! producing an arena-allocated AST, and the elaboration pass that lowers
//! the AST into Core.
//!
//! A source file is a `do`-block body. Expressions combine three infix
//! levels — elimination (`!`, loosest), the four arrows (`->`, `~>`,
//! `@->`, `@~>`, right-associative) and juxtaposition (application,
//! tightest) — over atoms: variables, string literals, `All`, `Nothing`,
//! `String`, binders (`[x T] -> e`, `rec [x T] -> e`) and the compound
//! forms `list { … }`, `choice { … }`, `try { … }` and `do { … }`.
//!
//! Elaboration replaces names by fresh numeric identifiers, introduces
//! inference variables for omitted types and for application results, and
//! produces a [`RangeMap`] relating source spans to the Core expressions
//! they elaborate to (the hover structure used by the LSP frontend).

pub mod ast;
pub mod elab;
pub mod parser;
pub mod range_map;

pub use ast::{Arg, AstContext, AstExpr, AstExprKind, AstExprMap, AstRecursion, AstTypeMap, DoBlock};
pub use elab::{elaborate, ElabError};
pub use parser::parse_file;
pub use range_map::RangeMap;
