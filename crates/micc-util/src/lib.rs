//! micc-util - Shared compiler infrastructure.
//!
//! This crate holds the pieces every pipeline stage needs: byte spans into
//! the source buffer, human-readable source locations, and the diagnostic
//! types that carry errors and warnings out of the compiler.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, Level};
pub use span::{SourceLoc, Span};
