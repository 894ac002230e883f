use std::fs;
use std::io::Write;

use camino::Utf8Path;
use tempfile::Builder;

use crate::error::TileplanError;

/// Creates every parent directory of `path`.
pub fn pave_path(path: &Utf8Path) -> Result<(), TileplanError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| TileplanError::Filesystem(format!("create {parent}: {err}")))
}

/// Writes through a temp file in the destination directory, then renames
/// it over `path`.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), TileplanError> {
    pave_path(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut temp = Builder::new()
        .prefix(".tileplan")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| TileplanError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| TileplanError::Filesystem(format!("write {path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| TileplanError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}
