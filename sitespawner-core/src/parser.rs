//! Coverage summary (`*.info`) parsing.
//!
//! Only the `SF:`, `LF:`, `LH:` and `end_of_record` lines of the LCOV trace
//! format are interpreted; every other line is skipped.

use std::path::{Path, PathBuf};

use log::debug;

use crate::domain::{CoverageCell, CoverageTable};
use crate::error::{Result, SiteSpawnerError};
use crate::fs::FileSystem;

/// Parse every summary file into a single coverage table.
///
/// All inputs are checked for existence before any of them is read, so a
/// missing file aborts the batch without partial results.
pub fn parse_summaries<F: FileSystem>(fs: &F, inputs: &[PathBuf]) -> Result<CoverageTable> {
    if let Some(missing) = inputs.iter().find(|input| !fs.is_file(input)) {
        return Err(SiteSpawnerError::InputNotFound(missing.clone()));
    }

    let mut table = CoverageTable::new();
    for input in inputs {
        let test_type = test_type_from_path(input)?;
        let contents = fs.read_to_string(input)?;
        debug!("parsing {} as test type '{test_type}'", input.display());
        parse_summary(&contents, &test_type, input, &mut table)?;
    }
    Ok(table)
}

/// Derive the test type from a summary file name.
///
/// The test type is the token after the last `_` and before the extension,
/// e.g. `coverage_batch_unit.info` yields `unit`.
pub fn test_type_from_path(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| invalid_name(path))?;
    let tail = file_name
        .rsplit_once('_')
        .map(|(_, tail)| tail)
        .unwrap_or(file_name);
    match tail.rsplit_once('.') {
        Some((test_type, _)) if !test_type.is_empty() => Ok(test_type.to_string()),
        _ => Err(invalid_name(path)),
    }
}

/// Parse the contents of one summary file into `table` under `test_type`.
///
/// Cells for a subject seen again under the same test type are added to the
/// existing ones, and the file's line sums are added to the total record.
pub fn parse_summary(
    contents: &str,
    test_type: &str,
    source: &Path,
    table: &mut CoverageTable,
) -> Result<()> {
    let mut state = RecordState::Idle;
    let mut file_total = CoverageCell::ZERO;
    let mut line_no = 0;

    for (index, line) in contents.lines().enumerate() {
        line_no = index + 1;
        if let Some(path) = line.strip_prefix("SF:") {
            state = state.open(path.trim());
        } else if let Some(value) = line.strip_prefix("LF:") {
            let found = parse_count(value, source, line_no, "LF")?;
            file_total.found = file_total
                .found
                .checked_add(found)
                .ok_or_else(|| overflow(source, line_no, "LF total"))?;
            state.counts_mut().found = found;
        } else if let Some(value) = line.strip_prefix("LH:") {
            let hit = parse_count(value, source, line_no, "LH")?;
            file_total.hit = file_total
                .hit
                .checked_add(hit)
                .ok_or_else(|| overflow(source, line_no, "LH total"))?;
            state.counts_mut().hit = hit;
        } else if line.starts_with("end_of_record") {
            let RecordState::InRecord { path, counts } = std::mem::take(&mut state) else {
                return Err(SiteSpawnerError::OrphanRecord {
                    path: source.to_path_buf(),
                    line: line_no,
                });
            };
            let cell = table
                .subjects
                .entry(path)
                .or_default()
                .entry(test_type.to_string())
                .or_default();
            *cell = cell
                .checked_add(counts)
                .ok_or_else(|| overflow(source, line_no, "record"))?;
        }
    }

    let total = table.total.entry(test_type.to_string()).or_default();
    *total = total
        .checked_add(file_total)
        .ok_or_else(|| overflow(source, line_no, "test type total"))?;
    Ok(())
}

/// Accumulator for the record currently being read.
#[derive(Debug, Default, PartialEq, Eq)]
enum RecordState {
    /// Between records.
    #[default]
    Idle,
    /// Counts were seen before any `SF:` line.
    Orphan { counts: CoverageCell },
    /// Inside a record started by `SF:`.
    InRecord { path: String, counts: CoverageCell },
}

impl RecordState {
    fn open(self, path: &str) -> Self {
        let counts = match self {
            Self::Idle => CoverageCell::ZERO,
            Self::Orphan { counts } | Self::InRecord { counts, .. } => counts,
        };
        Self::InRecord {
            path: path.to_string(),
            counts,
        }
    }

    fn counts_mut(&mut self) -> &mut CoverageCell {
        if matches!(self, Self::Idle) {
            *self = Self::Orphan {
                counts: CoverageCell::ZERO,
            };
        }
        match self {
            Self::Orphan { counts } | Self::InRecord { counts, .. } => counts,
            Self::Idle => unreachable!("idle state was replaced above"),
        }
    }
}

fn parse_count(value: &str, source: &Path, line: usize, field: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| SiteSpawnerError::Parse {
            path: source.to_path_buf(),
            line,
            message: format!("invalid {field} value '{}': {err}", value.trim()),
        })
}

fn overflow(source: &Path, line: usize, what: &str) -> SiteSpawnerError {
    SiteSpawnerError::Parse {
        path: source.to_path_buf(),
        line,
        message: format!("{what} exceeds {}", u64::MAX),
    }
}

fn invalid_name(path: &Path) -> SiteSpawnerError {
    SiteSpawnerError::Other(format!(
        "cannot derive a test type from '{}', expected '<name>_<test>.<ext>'",
        path.display()
    ))
}


#[cfg(test)]
mod proptest_tests {
    use super::parse_summary;
    use crate::domain::{CoverageCell, CoverageTable};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    /// One summary file: its test type and its text.
    fn summary_file() -> impl Strategy<Value = (String, String)> {
        let record = (
            0u8..6,
            (0u64..500).prop_flat_map(|found| (0..=found, Just(found))),
        );
        (
            prop::sample::select(vec!["all", "smoke", "unit"]),
            prop::collection::vec(record, 0..6),
        )
            .prop_map(|(test_type, records)| {
                let text: String = records
                    .into_iter()
                    .map(|(file, (hit, found))| {
                        format!("TN:\nSF:/s/f{file}.c\nLF:{found}\nLH:{hit}\nend_of_record\n")
                    })
                    .collect();
                (test_type.to_string(), text)
            })
    }

    fn parse_all(files: &[(String, String)]) -> CoverageTable {
        let mut table = CoverageTable::new();
        for (test_type, text) in files {
            parse_summary(text, test_type, Path::new("generated.info"), &mut table)
                .expect("parse");
        }
        table
    }

    proptest! {
        #[test]
        fn table_does_not_depend_on_input_order(
            (files, shuffled) in prop::collection::vec(summary_file(), 1..6)
                .prop_flat_map(|files| (Just(files.clone()), Just(files).prop_shuffle()))
        ) {
            prop_assert_eq!(parse_all(&files), parse_all(&shuffled));
        }

        #[test]
        fn grand_total_is_the_sum_of_file_cells(
            files in prop::collection::vec(summary_file(), 1..6)
        ) {
            let table = parse_all(&files);
            let mut summed: BTreeMap<String, CoverageCell> = BTreeMap::new();
            for record in table.subjects.values() {
                for (test_type, cell) in record {
                    *summed.entry(test_type.clone()).or_default() += *cell;
                }
            }
            for (test_type, total) in &table.total {
                let file_sum = summed.get(test_type).copied().unwrap_or_default();
                prop_assert_eq!(file_sum, *total, "test type {}", test_type);
            }
        }
    }
}
