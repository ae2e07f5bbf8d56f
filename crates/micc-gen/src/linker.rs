//! External linker invocation.
//!
//! The compiler writes one relocatable object and leaves the final link
//! to the system toolchain. `clang` is used as the linker driver so the C
//! runtime startup files come along for free.

use std::process::Command;

use crate::error::{CodeGenError, Result};

/// The intermediate object file path, relative to the working directory.
pub const OBJECT_FILE: &str = "a.obj";

/// Link [`OBJECT_FILE`] into an executable at `output_path`.
pub fn link(output_path: &str) -> Result<()> {
    let status = Command::new("clang")
        .arg("-o")
        .arg(output_path)
        .arg(OBJECT_FILE)
        .status()?;

    if !status.success() {
        return Err(CodeGenError::LinkerFailed(status.code().unwrap_or(-1)));
    }

    Ok(())
}
