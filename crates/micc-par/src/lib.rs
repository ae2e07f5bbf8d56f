//! micc-par - Parser (syntactic analyzer).
//!
//! Recursive descent over the token stream, with Pratt-style precedence
//! climbing for expressions. The parser owns all syntax diagnostics; any
//! production that cannot proceed returns a positioned
//! [`Diagnostic`](micc_util::Diagnostic), which the driver prints before
//! exiting. There is no recovery: the first error ends the compile.
//!
//! Grammar sketch (EBNF):
//!
//! ```ebnf
//! root        = { declaration } ;
//! declaration = type name ( variable-tail | function-tail ) ;
//! variable-tail = [ "=" expression ] ";" ;
//! function-tail = "(" parameters ")" ( ";" | block ) ;
//! block       = "{" { statement } "}" ;
//! statement   = ";" statement
//!             | type name variable-tail
//!             | "return" [ expression ] ";"
//!             | expression ";" ;
//! expression  = unary { binary-op expression | call-suffix } ;
//! unary       = ( "-" | "!" ) unary | INT | FLOAT | IDENTIFIER ;
//! ```
//!
//! Expression precedence, ascending: sum (`+` `-`), product (`*` `/`),
//! prefix (`-` `!`), call (postfix `(`). Binary operators are
//! left-associative, which falls out of re-entering the Pratt loop with
//! the operator's own precedence as the minimum.

pub mod ast;
pub mod parser;
pub mod precedence;
pub mod types;

pub use ast::{
    BinaryOp, Declaration, Expr, ExprKind, Function, FunctionParameter, FunctionPrototype, Name,
    Root, Stmt, StmtKind, UnaryOp, Variable,
};
pub use parser::Parser;
pub use precedence::Precedence;
pub use types::{FunctionType, Type};
