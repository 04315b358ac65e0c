//! Safety utilities to prevent overwriting input datasets.
//!
//! The base collection holds human-verified corrections; an output path
//! pointing at it would destroy them.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Resolve symlinks and relative segments when the file exists.
fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that output paths are safe to create/overwrite.
///
/// Checks:
/// - No output may be the same file as any source
/// - No two outputs may be the same file
pub fn validate_output_paths(outputs: &[&Path], sources: &[&Path]) -> Result<()> {
    for (i, output) in outputs.iter().enumerate() {
        let out = resolved(output);
        for source in sources {
            if out == resolved(source) {
                bail!(
                    "Safety check failed: output '{}' cannot be the same as input '{}'",
                    output.display(),
                    source.display()
                );
            }
        }
        for other in &outputs[i + 1..] {
            if out == resolved(other) {
                bail!(
                    "Safety check failed: outputs '{}' and '{}' are the same file",
                    output.display(),
                    other.display()
                );
            }
        }
    }
    Ok(())
}
