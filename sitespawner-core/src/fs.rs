//! Filesystem abstractions used by the report pipeline.

use std::path::{Path, PathBuf};

use crate::error::{Result, SiteSpawnerError};

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// Find the files at any depth under `root`, hidden directories
    /// included, whose name matches the glob `pattern`. Sorted.
    fn find_files(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>>;
    /// List the immediate subdirectories of a directory, sorted.
    fn list_dirs(&self, root: &Path) -> Result<Vec<PathBuf>>;
    /// Read a file into a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Create or overwrite a file with the given contents.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
    /// Whether the path is an existing regular file.
    fn is_file(&self, path: &Path) -> bool;
    /// Whether the path is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;
    /// Create a directory and its missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn find_files(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let base = glob::Pattern::escape(&root.to_string_lossy());
        let full = format!("{base}/**/{pattern}");
        let entries = glob::glob(&full).map_err(|err| SiteSpawnerError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn list_dirs(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        Ok(std::fs::write(path, contents)?)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(std::fs::create_dir_all(path)?)
    }
}
