//! Error types for code generation.

use micc_util::Diagnostic;
use thiserror::Error;

/// Everything that can stop the back half of the compile.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// A positioned semantic error; prints as `line:col: error: message`.
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),

    /// The LLVM backend refused an operation.
    #[error("error: {0}")]
    Backend(String),

    /// The linker process could not be spawned.
    #[error("error: {0}")]
    Io(#[from] std::io::Error),

    /// The linker ran and failed.
    #[error("error: linker command failed with exit code {0}")]
    LinkerFailed(i32),
}

/// Result type alias for code generation operations.
pub type Result<T> = std::result::Result<T, CodeGenError>;

impl CodeGenError {
    /// Wrap an inkwell builder error.
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        CodeGenError::Backend(err.to_string())
    }
}
