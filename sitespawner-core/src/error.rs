//! Error types for SiteSpawner core.

use std::path::PathBuf;
use std::{error::Error, fmt, io};

/// Error type for SiteSpawner core operations.
#[derive(Debug)]
pub enum SiteSpawnerError {
    /// An underlying I/O error.
    Io(io::Error),
    /// A coverage summary file passed as input does not exist.
    InputNotFound(PathBuf),
    /// The report output directory does not exist.
    OutputDirectoryMissing(PathBuf),
    /// A subject path could not be placed under the configured root.
    PathResolution {
        /// Path that failed to resolve.
        path: PathBuf,
        /// Root the path was expected to live under.
        root: PathBuf,
    },
    /// A coverage summary line could not be interpreted.
    Parse {
        /// Summary file being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// An `end_of_record` was reached without a preceding `SF:` line.
    OrphanRecord {
        /// Summary file being parsed.
        path: PathBuf,
        /// One-based line number of the `end_of_record`.
        line: usize,
    },
    /// Template registration or rendering failed.
    Template(String),
    /// No raw coverage data files were found for conversion.
    NoCoverageData(PathBuf),
    /// The external coverage conversion tool failed.
    Conversion(String),
    /// A file name pattern is not valid glob syntax.
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for SiteSpawnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::InputNotFound(path) => {
                write!(f, "input file '{}' does not exist", path.display())
            }
            Self::OutputDirectoryMissing(path) => {
                write!(f, "output directory '{}' does not exist", path.display())
            }
            Self::PathResolution { path, root } => write!(
                f,
                "path '{}' is not located under '{}'",
                path.display(),
                root.display()
            ),
            Self::Parse {
                path,
                line,
                message,
            } => write!(f, "{}:{line}: {message}", path.display()),
            Self::OrphanRecord { path, line } => write!(
                f,
                "{}:{line}: end_of_record without a preceding SF: line",
                path.display()
            ),
            Self::Template(message) => write!(f, "template error: {message}"),
            Self::NoCoverageData(dir) => write!(
                f,
                "no coverage data files were found in '{}'",
                dir.display()
            ),
            Self::Conversion(message) => write!(f, "conversion failed: {message}"),
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid file pattern '{pattern}': {message}")
            }
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for SiteSpawnerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SiteSpawnerError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<glob::GlobError> for SiteSpawnerError {
    fn from(value: glob::GlobError) -> Self {
        Self::Io(value.into_error())
    }
}

impl From<handlebars::RenderError> for SiteSpawnerError {
    fn from(value: handlebars::RenderError) -> Self {
        Self::Template(value.to_string())
    }
}

impl From<handlebars::TemplateError> for SiteSpawnerError {
    fn from(value: handlebars::TemplateError) -> Self {
        Self::Template(value.to_string())
    }
}

impl From<serde_json::Error> for SiteSpawnerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Template(value.to_string())
    }
}

/// Convenience result type for SiteSpawner core.
pub type Result<T> = std::result::Result<T, SiteSpawnerError>;
