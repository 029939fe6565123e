//! The linker interface (§6.3), grounded in `original_source/src/linker.h`
//! and its platform-specific `COFFLinker`: the original hides "find a host
//! linker binary, shell out to it" behind a `create_linker(LinkerType)`
//! factory. `SystemLinker` plays the same role for a single, portable
//! target: the host C toolchain driver, reached via `std::process::Command`
//! the same way the original's linker ultimately drives `link.exe`/`lld`.

use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkError(pub String);

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link failed: {}", self.0)
    }
}

impl std::error::Error for LinkError {}

pub trait Linker {
    /// Links `objects` into an executable at `output_stem` (plus the host's
    /// native extension) with entry point `main`, returning the produced
    /// path.
    fn link(&self, objects: &[PathBuf], output_stem: &Path) -> Result<PathBuf, LinkError>;
}

/// Shells out to `cc`, the lowest common denominator host toolchain driver
/// present wherever a C compiler is installed — the Unix analogue of the
/// original's COFF-specific linker discovery, without committing to one
/// platform's linker binary by name.
pub struct SystemLinker {
    driver: String,
}

impl SystemLinker {
    #[must_use]
    pub fn new() -> Self {
        Self { driver: std::env::var("PROTOLANG_CC").unwrap_or_else(|_| "cc".to_owned()) }
    }
}

impl Default for SystemLinker {
    fn default() -> Self {
        Self::new()
    }
}

impl Linker for SystemLinker {
    fn link(&self, objects: &[PathBuf], output_stem: &Path) -> Result<PathBuf, LinkError> {
        let output_path = if cfg!(windows) { output_stem.with_extension("exe") } else { output_stem.to_path_buf() };

        let status = Command::new(&self.driver)
            .args(objects)
            .arg("-o")
            .arg(&output_path)
            .status()
            .map_err(|e| LinkError(format!("could not launch `{}`: {e}", self.driver)))?;

        if status.success() {
            Ok(output_path)
        } else {
            Err(LinkError(format!("`{}` exited with {status}", self.driver)))
        }
    }
}
