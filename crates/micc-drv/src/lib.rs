//! micc-drv - Compiler driver.
//!
//! Orchestrates the pipeline end to end:
//!
//! ```text
//! source file ──► Lexer ──► Parser ──► CodeGen ──► a.obj ──► clang ──► a.out
//! ```
//!
//! The driver is the single exit point for errors. Each stage returns a
//! typed error; `main` prints it on one line and exits 1. Positioned
//! diagnostics already carry their own `line:col: error:` prefix, so they
//! print bare; driver-level failures print with a fixed text.

use std::path::Path;

use inkwell::context::Context;
use micc_gen::{link, CodeGen, CodeGenError, OBJECT_FILE};
use micc_par::Parser;
use micc_util::Diagnostic;
use thiserror::Error;

/// The linked executable path when no output name is given.
pub const DEFAULT_OUTPUT: &str = "a.out";

/// Everything that can end a driver run.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A positioned parse diagnostic; prints as `line:col: error: …`.
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),

    /// A code generation or linking failure; carries its own prefix.
    #[error("{0}")]
    CodeGen(#[from] CodeGenError),

    /// The source file could not be read.
    #[error("error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error: no input files provided")]
    NoInputFiles,

    #[error("todo: multiple input files not handled yet")]
    MultipleInputFiles,
}

/// Run the driver over the command-line arguments (program name already
/// stripped). Compiles the single input and links it into
/// [`DEFAULT_OUTPUT`].
pub fn run(args: impl Iterator<Item = String>) -> Result<(), DriverError> {
    let input_files: Vec<String> = args.collect();

    if input_files.is_empty() {
        return Err(DriverError::NoInputFiles);
    }

    if input_files.len() > 1 {
        return Err(DriverError::MultipleInputFiles);
    }

    compile_file(&input_files[0])?;

    link(DEFAULT_OUTPUT)?;

    Ok(())
}

/// Compile one source file into [`OBJECT_FILE`](micc_gen::OBJECT_FILE).
pub fn compile_file(source_file_path: &str) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(source_file_path)?;

    compile_source(source_file_path, &source)
}

/// Compile in-memory source text into the intermediate object file.
pub fn compile_source(source_file_path: &str, source: &str) -> Result<(), DriverError> {
    let root = Parser::new(source).parse_root()?;

    let context = Context::create();
    let mut gen = CodeGen::new(&context, source_file_path);

    gen.compile_root(&root)?;
    gen.write_object_file(Path::new(OBJECT_FILE))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_input_files() {
        let err = run(std::iter::empty()).unwrap_err();
        assert_eq!(err.to_string(), "error: no input files provided");
    }

    #[test]
    fn test_multiple_input_files() {
        let args = ["a.c".to_string(), "b.c".to_string()];
        let err = run(args.into_iter()).unwrap_err();
        assert_eq!(err.to_string(), "todo: multiple input files not handled yet");
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let err = compile_file("definitely/not/a/real/file.c").unwrap_err();
        assert!(err.to_string().starts_with("error: "), "was: {}", err);
    }

    #[test]
    fn test_parse_error_is_a_bare_diagnostic() {
        let err = compile_source("test.c", "int !").unwrap_err();
        assert_eq!(err.to_string(), "1:5: error: expected an identifier");
    }
}
