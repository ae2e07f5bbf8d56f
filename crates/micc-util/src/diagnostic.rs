//! Diagnostic module - Error and warning reporting.
//!
//! The compile is fail-stop: the first error terminates the run. Instead
//! of exiting from deep inside a pipeline stage, every fallible operation
//! returns `Result<T, Diagnostic>` and the driver prints the diagnostic
//! and exits. Warnings never abort; they are printed as they occur.
//!
//! Every diagnostic renders on a single line:
//!
//! ```text
//! <line>:<column>: <label>: <message>
//! ```

use std::fmt;

use thiserror::Error;

use crate::span::SourceLoc;

/// Diagnostic severity level.
///
/// # Examples
///
/// ```
/// use micc_util::diagnostic::Level;
///
/// assert_eq!(format!("{}", Level::Error), "error");
/// assert_eq!(format!("{}", Level::Warning), "warning");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A fatal error; compilation stops at the first one.
    Error,
    /// A non-fatal warning.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A positioned compiler diagnostic.
///
/// # Examples
///
/// ```
/// use micc_util::diagnostic::Diagnostic;
/// use micc_util::span::SourceLoc;
///
/// let diag = Diagnostic::error(SourceLoc { line: 1, column: 16 }, "undefined 'x'");
/// assert_eq!(diag.to_string(), "1:16: error: undefined 'x'");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{loc}: {level}: {message}")]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,
    /// Source position the diagnostic points at.
    pub loc: SourceLoc,
    /// Main diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            loc,
            message: message.into(),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            loc,
            message: message.into(),
        }
    }

    /// Print this diagnostic to standard error.
    ///
    /// Used directly for warnings; errors are instead propagated up to the
    /// driver, which prints them through the same `Display` impl.
    pub fn emit(&self) {
        eprintln!("{}", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize, column: usize) -> SourceLoc {
        SourceLoc { line, column }
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Error.to_string(), "error");
        assert_eq!(Level::Warning.to_string(), "warning");
    }

    #[test]
    fn test_error_format() {
        let diag = Diagnostic::error(loc(3, 7), "expected an expression");
        assert_eq!(diag.to_string(), "3:7: error: expected an expression");
        assert_eq!(diag.level, Level::Error);
    }

    #[test]
    fn test_warning_format() {
        let diag = Diagnostic::warning(loc(1, 1), "return type of 'main' is not 'int'");
        assert_eq!(
            diag.to_string(),
            "1:1: warning: return type of 'main' is not 'int'"
        );
        assert_eq!(diag.level, Level::Warning);
    }

    #[test]
    fn test_diagnostic_is_an_error_type() {
        fn takes_error(_: &dyn std::error::Error) {}
        let diag = Diagnostic::error(loc(1, 1), "unkown type");
        takes_error(&diag);
    }
}
