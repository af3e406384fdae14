//! Shared utility functions for wheelhouse crates

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Resolve `path` against the current directory.
///
/// The path does not have to exist and symlinks are left alone. Build
/// commands run inside the checkout, so every directory handed to them must
/// be absolute.
pub fn absolute_path(path: &Utf8Path) -> Result<Utf8PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let resolved = std::path::absolute(path)?;
    Utf8PathBuf::from_path_buf(resolved).map_err(|p| {
        Error::invalid_config(format!("Path is not valid UTF-8: {}", p.display()))
    })
}
