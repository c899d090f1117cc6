//! Error types for the filesystem module.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while setting up a directory watch.
#[derive(Debug)]
pub enum FileSystemError {
    /// The platform watcher could not be created.
    Backend(notify::Error),
    /// Watching or unwatching `path` failed.
    Watch {
        /// The directory involved.
        path: PathBuf,
        /// Error reported by the watcher.
        source: notify::Error,
    },
    /// Only directories are watched.
    NotADirectory(PathBuf),
}

impl FileSystemError {
    pub(crate) fn watch(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        FileSystemError::Watch {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSystemError::Backend(e) => write!(f, "Cannot start file watcher: {}", e),
            FileSystemError::Watch { path, source } => write!(f, "Cannot watch {:?}: {}", path, source),
            FileSystemError::NotADirectory(path) => write!(f, "{:?} is not a directory", path),
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileSystemError::Backend(e) => Some(e),
            FileSystemError::Watch { source, .. } => Some(source),
            FileSystemError::NotADirectory(_) => None,
        }
    }
}

impl From<notify::Error> for FileSystemError {
    fn from(err: notify::Error) -> Self {
        FileSystemError::Backend(err)
    }
}
