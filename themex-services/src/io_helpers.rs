// SPDX-License-Identifier: LGPL-3.0-only

//! Async I/O helpers using smol::unblock for non-blocking file operations

use std::io;
use std::path::Path;

/// Read the entire contents of a file into a bytes vector asynchronously.
///
/// Runs `std::fs::read` on the blocking thread pool, so the event loop keeps
/// running while large stylesheets are read.
pub async fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let path = path.to_path_buf();
    smol::unblock(move || std::fs::read(path)).await
}

/// Check whether `path` names an existing regular file.
pub async fn is_file(path: &Path) -> bool {
    let path = path.to_path_buf();
    smol::unblock(move || path.is_file()).await
}

/// Write `contents` to `path`, creating the parent directory first if it is missing.
pub async fn write_file(path: &Path, contents: impl Into<Vec<u8>>) -> io::Result<()> {
    let path = path.to_path_buf();
    let contents = contents.into();
    smol::unblock(move || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    })
    .await
}
