//! Aggregation of file-level coverage into directory and per-directory views.
//!
//! Every function here derives a new table from its input; nothing is shared
//! or mutated between views.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::domain::{CoverageCell, CoverageRecord, CoverageTable};
use crate::error::{Result, SiteSpawnerError};

/// Key used for files that live directly in the code root.
pub const ROOT_DIRECTORY_KEY: &str = ".";

/// Fill in `(0, 0)` cells so every record (including the total) has an entry
/// for every test type present anywhere in the table.
pub fn unify(mut table: CoverageTable) -> CoverageTable {
    let test_types = table.test_types();
    for record in table
        .subjects
        .values_mut()
        .chain(std::iter::once(&mut table.total))
    {
        for test_type in &test_types {
            record.entry(test_type.clone()).or_insert(CoverageCell::ZERO);
        }
    }
    table
}

/// Group file-level cells by their containing directory relative to `root`.
///
/// Cells are collected per directory and test type without summing so the
/// caller decides when to fold them. Files are grouped by their immediate
/// parent only; nested directories are not rolled up into their ancestors.
pub fn group_by_directory(
    table: &CoverageTable,
    root: &Path,
) -> Result<CoverageTable<Vec<CoverageCell>>> {
    let root = resolve_path(root)?;
    let mut grouped: CoverageTable<Vec<CoverageCell>> = CoverageTable::new();
    grouped.total = table.total.clone();

    for (subject, record) in &table.subjects {
        let directory = directory_key(Path::new(subject), &root)?;
        let lists = grouped.subjects.entry(directory).or_default();
        for (test_type, cell) in record {
            lists.entry(test_type.clone()).or_default().push(*cell);
        }
    }

    Ok(grouped)
}

/// Sum the per-directory cell lists into one cell per test type.
///
/// A list whose summed `found` is zero folds to `(0, 0)`.
pub fn fold_directory_lists(table: &CoverageTable<Vec<CoverageCell>>) -> CoverageTable {
    let subjects = table
        .subjects
        .iter()
        .map(|(directory, lists)| {
            let record: CoverageRecord = lists
                .iter()
                .map(|(test_type, cells)| (test_type.clone(), fold_cells(cells)))
                .collect();
            (directory.clone(), record)
        })
        .collect();

    CoverageTable {
        subjects,
        total: table.total.clone(),
    }
}

/// Restrict the file-level table to files directly inside `directory`.
///
/// Subjects are re-keyed by file name and the total record is recomputed
/// from the selected files only.
pub fn group_by_file_within_directory(
    table: &CoverageTable,
    directory: &str,
    root: &Path,
) -> Result<CoverageTable> {
    let root = resolve_path(root)?;
    let mut scoped = CoverageTable::new();

    for (subject, record) in &table.subjects {
        let path = Path::new(subject);
        if directory_key(path, &root)? != directory {
            continue;
        }
        let name = file_name(path)?;
        for (test_type, cell) in record {
            *scoped.total.entry(test_type.clone()).or_default() += *cell;
        }
        scoped.subjects.insert(name, record.clone());
    }

    Ok(scoped)
}

/// Directory key of `path`: its resolved parent relative to `root`, joined
/// with `/`, or `"."` for the root itself. `root` must already be resolved.
pub fn directory_key(path: &Path, root: &Path) -> Result<String> {
    let resolved = resolve_path(path)?;
    let parent = resolved.parent().unwrap_or(&resolved);
    let relative = parent
        .strip_prefix(root)
        .map_err(|_| SiteSpawnerError::PathResolution {
            path: resolved.clone(),
            root: root.to_path_buf(),
        })?;
    Ok(path_key(relative))
}

/// Segments of the resolved `path` relative to the resolved `root`, used for
/// breadcrumbs.
pub fn relative_segments(path: &Path, root: &Path) -> Result<Vec<String>> {
    let resolved = resolve_path(path)?;
    let relative = resolved
        .strip_prefix(root)
        .map_err(|_| SiteSpawnerError::PathResolution {
            path: resolved.clone(),
            root: root.to_path_buf(),
        })?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect())
}

/// Make `path` absolute, drop `.`/`..` components and follow symlinks for
/// the part of the path that exists.
///
/// Paths that do not exist are accepted, so reports can be produced away from
/// the machine that collected the coverage data.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(canonicalize_existing_prefix(&normalize(&absolute)))
}

fn fold_cells(cells: &[CoverageCell]) -> CoverageCell {
    let sum: CoverageCell = cells.iter().sum();
    if sum.found > 0 { sum } else { CoverageCell::ZERO }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SiteSpawnerError::PathResolution {
            path: path.to_path_buf(),
            root: PathBuf::new(),
        })
}

fn path_key(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ROOT_DIRECTORY_KEY.to_string()
    } else {
        parts.join("/")
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut missing: Vec<OsString> = Vec::new();
    let mut current = path;
    loop {
        if let Ok(resolved) = std::fs::canonicalize(current) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}
