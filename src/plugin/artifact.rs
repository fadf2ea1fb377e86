use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Location of a single loadable archive.
///
/// Ordering compares the raw path bytes, so `plugins/a-b/x.jar` sorts before
/// `plugins/a/x.jar`. `Path`'s own ordering is per component and would not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLocation {
    path: PathBuf,
}

impl ArtifactLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// `file:` URL form handed to class loaders.
    pub fn to_url(&self) -> String {
        format!("file:{}", self.path.display())
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl Ord for ArtifactLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.as_os_str().cmp(other.path.as_os_str())
    }
}

impl PartialOrd for ArtifactLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for ArtifactLocation {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
