//! Output filesystem abstraction.
//!
//! Emitted modules and stubs are written through [`OutputFileSystem`] so a
//! build can target the real disk or an in-memory tree (dry runs, tests).

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Filesystem the emitted tree is written to.
pub trait OutputFileSystem: Send + Sync {
    /// Create `dir` and all of its missing parents.
    fn mkdirp<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, io::Result<()>>;

    /// Create or overwrite `path` with `contents`.
    fn write_file<'a>(&'a self, path: &'a Path, contents: &'a str)
        -> BoxFuture<'a, io::Result<()>>;
}

/// The real filesystem, via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl OutputFileSystem for DiskFileSystem {
    fn mkdirp<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        tokio::fs::create_dir_all(dir).boxed()
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a str,
    ) -> BoxFuture<'a, io::Result<()>> {
        tokio::fs::write(path, contents).boxed()
    }
}

/// In-memory filesystem.
///
/// Like a real disk, a write fails with `NotFound` unless its parent
/// directory was created first.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a written file.
    #[must_use]
    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// All written files, sorted by path.
    #[must_use]
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        self.lock().files.clone()
    }

    #[must_use]
    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        path.parent().is_none() || self.lock().dirs.contains(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputFileSystem for MemoryFileSystem {
    fn mkdirp<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        async move {
            let mut state = self.lock();
            if state.files.contains_key(dir) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a file", dir.display()),
                ));
            }
            for ancestor in dir.ancestors().filter(|a| a.parent().is_some()) {
                state.dirs.insert(ancestor.to_path_buf());
            }
            Ok(())
        }
        .boxed()
    }

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a str,
    ) -> BoxFuture<'a, io::Result<()>> {
        async move {
            let parent = path.parent().unwrap_or_else(|| Path::new("/"));
            let mut state = self.lock();
            if parent.parent().is_some() && !state.dirs.contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
            state.files.insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_write_requires_directory() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/out/a/b.js");

        let err = fs.write_file(path, "x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.mkdirp(Path::new("/out/a")).await.unwrap();
        assert!(fs.is_dir("/out"));
        fs.write_file(path, "x").await.unwrap();
        assert_eq!(fs.read(path).as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_memory_write_overwrites() {
        let fs = MemoryFileSystem::new();
        fs.mkdirp(Path::new("/out")).await.unwrap();
        fs.write_file(Path::new("/out/a.js"), "1").await.unwrap();
        fs.write_file(Path::new("/out/a.js"), "2").await.unwrap();
        assert_eq!(fs.files().len(), 1);
        assert_eq!(fs.read("/out/a.js").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_disk_mkdirp_then_write() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("x/y/z");
        let file = nested.join("m.js");

        DiskFileSystem.mkdirp(&nested).await.unwrap();
        DiskFileSystem.write_file(&file, "export {};").await.unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "export {};");
    }

    #[tokio::test]
    async fn test_disk_mkdirp_over_file_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        assert!(DiskFileSystem.mkdirp(&blocker.join("sub")).await.is_err());
    }
}
