use crate::{FileScanner, IndexerError, Result};
use std::path::{Path, PathBuf};

/// Ordered, extension-filtered candidate files under one workspace root.
///
/// Contents are read lazily through [`WorkspaceFileSet::read`]; the set itself
/// only holds paths in enumeration order, which is the order ties are broken in.
#[derive(Debug, Clone)]
pub struct WorkspaceFileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl WorkspaceFileSet {
    /// Enumerate the live file set under `root`.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = canonical_root(root.as_ref())?;
        let files = FileScanner::new(&root).scan();
        Ok(Self { root, files })
    }

    /// Wrap an enumeration produced elsewhere. Paths outside `root` are dropped.
    pub fn from_paths(root: impl AsRef<Path>, files: impl IntoIterator<Item = PathBuf>) -> Self {
        let root = root.as_ref().to_path_buf();
        let files = files
            .into_iter()
            .map(|path| {
                if path.is_absolute() {
                    path
                } else {
                    root.join(path)
                }
            })
            .filter(|path| {
                let inside = path.starts_with(&root)
                    && !path
                        .components()
                        .any(|c| matches!(c, std::path::Component::ParentDir));
                if !inside {
                    log::warn!("Ignoring {} outside workspace root", path.display());
                }
                inside
            })
            .collect();
        Self { root, files }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Read one file as text. Invalid UTF-8 is replaced rather than rejected.
    pub fn read(&self, path: &Path) -> Result<String> {
        std::fs::read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|source| IndexerError::FileUnreadable {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Path relative to the root, `/`-separated, for logs and notes.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

pub(crate) fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|e| IndexerError::InvalidPath(format!("{}: {e}", root.display())))?;
    if !canonical.is_dir() {
        return Err(IndexerError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(canonical)
}
