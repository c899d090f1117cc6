//! File system change watcher.

use crate::filesystem::error::FileSystemError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use smol::channel::{self, Receiver};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A change detected in the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSystemChange {
    /// A new file or directory was created.
    Created(PathBuf),
    /// An existing file or directory was modified.
    Modified(PathBuf),
    /// A file or directory was removed.
    Removed(PathBuf),
    /// A file or directory was renamed.
    Renamed {
        /// Old path.
        old: PathBuf,
        /// New path.
        new: PathBuf,
    },
}

impl FileSystemChange {
    /// Returns true if the change involves a file named `name`.
    ///
    /// A rename matches on either side, so a save that writes a temporary
    /// file and renames it over the target is reported.
    pub fn concerns(&self, name: &OsStr) -> bool {
        let named = |path: &PathBuf| path.file_name() == Some(name);
        match self {
            FileSystemChange::Created(path)
            | FileSystemChange::Modified(path)
            | FileSystemChange::Removed(path) => named(path),
            FileSystemChange::Renamed { old, new } => named(old) || named(new),
        }
    }
}

/// Watches a directory for changes.
///
/// `notify` delivers events on its own thread; they are queued on a channel
/// and picked up by [FileSystemWatcher::next_changes] or
/// [FileSystemWatcher::poll_events] on the caller's thread.
pub struct FileSystemWatcher {
    watcher: RecommendedWatcher,
    event_rx: Receiver<notify::Result<Event>>,
}

impl FileSystemWatcher {
    /// Create a new file system watcher.
    pub fn new() -> Result<Self, FileSystemError> {
        let (tx, rx) = channel::unbounded();
        let watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // The receiver is gone once the watcher is dropped.
            let _ = tx.try_send(event);
        })?;

        Ok(Self {
            watcher,
            event_rx: rx,
        })
    }

    /// Start watching a directory for changes.
    pub fn watch(&mut self, path: &Path) -> Result<(), FileSystemError> {
        if !path.is_dir() {
            return Err(FileSystemError::NotADirectory(path.to_path_buf()));
        }
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| FileSystemError::watch(path, e))?;
        Ok(())
    }

    /// Stop watching a path.
    pub fn unwatch(&mut self, path: &Path) -> Result<(), FileSystemError> {
        self.watcher.unwatch(path).map_err(|e| FileSystemError::watch(path, e))?;
        Ok(())
    }

    /// Poll for filesystem events (non-blocking).
    ///
    /// Returns all pending events since the last call.
    pub fn poll_events(&self) -> Vec<FileSystemChange> {
        let mut changes = Vec::new();

        while let Ok(event) = self.event_rx.try_recv() {
            changes.extend(Self::accept(event));
        }

        changes
    }

    /// Wait for the next batch of changes.
    ///
    /// Returns [None] once the watcher has shut down.
    pub async fn next_changes(&self) -> Option<Vec<FileSystemChange>> {
        let event = self.event_rx.recv().await.ok()?;
        let mut changes = Self::accept(event);
        changes.extend(self.poll_events());
        Some(changes)
    }

    fn accept(event: notify::Result<Event>) -> Vec<FileSystemChange> {
        match event {
            Ok(event) => Self::convert_event(event),
            Err(e) => {
                log::warn!("File watcher error: {}", e);
                Vec::new()
            },
        }
    }

    /// Convert a notify Event into FileSystemChange events.
    fn convert_event(event: Event) -> Vec<FileSystemChange> {
        use notify::event::ModifyKind;

        match event.kind {
            EventKind::Create(_) => event.paths.into_iter().map(FileSystemChange::Created).collect(),
            EventKind::Remove(_) => event.paths.into_iter().map(FileSystemChange::Removed).collect(),
            EventKind::Modify(ModifyKind::Name(_)) if event.paths.len() >= 2 => {
                let mut paths = event.paths.into_iter();
                match (paths.next(), paths.next()) {
                    (Some(old), Some(new)) => vec![FileSystemChange::Renamed { old, new }],
                    _ => Vec::new(),
                }
            },
            // Reading a file does not change it.
            EventKind::Access(_) => Vec::new(),
            EventKind::Modify(_) | EventKind::Other | EventKind::Any => {
                event.paths.into_iter().map(FileSystemChange::Modified).collect()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RenameMode};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_convert_rename() {
        let changes = FileSystemWatcher::convert_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/css/.gnome-shell.css.swp", "/css/gnome-shell.css"],
        ));
        assert_eq!(
            changes,
            vec![FileSystemChange::Renamed {
                old: PathBuf::from("/css/.gnome-shell.css.swp"),
                new: PathBuf::from("/css/gnome-shell.css"),
            }]
        );
        assert!(changes[0].concerns(OsStr::new("gnome-shell.css")));
    }

    #[test]
    fn test_access_is_ignored() {
        let changes = FileSystemWatcher::convert_event(event(
            EventKind::Access(notify::event::AccessKind::Any),
            &["/css/gnome-shell.css"],
        ));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_concerns_matches_file_name_only() {
        let change = FileSystemWatcher::convert_event(event(
            EventKind::Create(CreateKind::File),
            &["/css/gnome-shell-dark.css"],
        ))
        .remove(0);
        assert!(change.concerns(OsStr::new("gnome-shell-dark.css")));
        assert!(!change.concerns(OsStr::new("gnome-shell.css")));
    }

    #[test]
    fn test_watch_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gnome-shell.css");
        std::fs::write(&file, "").unwrap();

        let mut watcher = FileSystemWatcher::new().unwrap();
        assert!(matches!(watcher.watch(&file), Err(FileSystemError::NotADirectory(_))));
        watcher.watch(dir.path()).unwrap();
    }
}
