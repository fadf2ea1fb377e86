use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Read-only view of an install layout.
pub trait LayoutReader {
    /// Kind of the entry at `path`, or `None` when nothing is there.
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Direct children of `dir`. Callers check that `dir` exists first.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>>;
}

/// The real filesystem. Symlinks are followed; a dangling one is treated as
/// absent, the same as [`LayoutReader::entry_kind`] reports it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskLayout;

impl LayoutReader for DiskLayout {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>> {
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(true)
            .max_depth(Some(1))
            .build();

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_vanished_child(&err) => continue,
                Err(err) => return Err(into_io_error(err)),
            };
            if entry.depth() == 0 {
                continue;
            }

            let kind = match entry.file_type() {
                Some(file_type) if file_type.is_dir() => EntryKind::Dir,
                _ => EntryKind::File,
            };
            entries.push((entry.into_path(), kind));
        }

        Ok(entries)
    }
}

/// A child that disappears while being stat'ed, such as a dangling symlink.
fn is_vanished_child(err: &ignore::Error) -> bool {
    err.depth() != Some(0)
        && err
            .io_error()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

fn into_io_error(err: ignore::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error()
        .unwrap_or_else(|| io::Error::other(message))
}

/// In-memory layout made of file paths; directories exist implicitly as the
/// ancestors of those files.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    files: BTreeSet<PathBuf>,
    unreadable: BTreeMap<PathBuf, io::ErrorKind>,
}

impl MemoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.insert(path);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.files.insert(path.into());
    }

    /// Make every read of `path` fail with `kind`.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.unreadable.insert(path.into(), kind);
        self
    }

    fn check_readable(&self, path: &Path) -> io::Result<()> {
        match self.unreadable.get(path) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("{} is unreadable", path.display()),
            )),
            None => Ok(()),
        }
    }
}

impl LayoutReader for MemoryLayout {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        self.check_readable(path)?;

        if self.files.contains(path) {
            return Ok(Some(EntryKind::File));
        }

        let is_dir = self
            .files
            .iter()
            .any(|file| file != path && file.starts_with(path));
        Ok(is_dir.then_some(EntryKind::Dir))
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>> {
        self.check_readable(dir)?;

        let mut children = BTreeMap::new();
        for file in &self.files {
            let Ok(rest) = file.strip_prefix(dir) else {
                continue;
            };

            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };

            let kind = if components.next().is_some() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            children.entry(dir.join(first)).or_insert(kind);
        }

        Ok(children.into_iter().collect())
    }
}
