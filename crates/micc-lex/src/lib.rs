//! micc-lex - Lexical analyzer.
//!
//! The lexer is a byte-position cursor over the source buffer. Each call to
//! [`Lexer::next_token`] skips leading whitespace and produces one
//! classified [`Token`] carrying its source [`Span`](micc_util::Span).
//!
//! The lexer state is `Copy`: lookahead is done by copying the cursor,
//! advancing the copy, and discarding it. The parser relies on this to
//! branch on the next token without committing to it.
//!
//! There is no error reporting at this stage. Bytes that start no valid
//! token become [`TokenKind::Invalid`] and are rejected by the parser,
//! which owns all diagnostics.

mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
