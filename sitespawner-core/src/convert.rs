//! Conversion of raw Verilator coverage data (`*.dat`) into `*.info`
//! summaries.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteSpawnerError};
use crate::fs::{FileSystem, StdFileSystem};

/// File name pattern of raw coverage data.
pub const DEFAULT_PATTERN: &str = "coverage*.dat";
/// Program converting raw coverage data.
pub const VERILATOR_COVERAGE: &str = "verilator_coverage";

/// Converts one raw coverage data file into a summary.
#[cfg_attr(test, mockall::automock)]
pub trait CoverageConverter {
    /// Write the summary of `dat` to `info`.
    fn convert(&self, dat: &Path, info: &Path) -> Result<()>;
}

/// Runs `verilator_coverage --write-info <info> <dat>`.
#[derive(Debug, Clone)]
pub struct VerilatorCoverage {
    program: String,
}

impl VerilatorCoverage {
    /// Converter using `verilator_coverage` from `PATH`.
    pub fn new() -> Self {
        Self::with_program(VERILATOR_COVERAGE)
    }

    /// Converter using an explicit program.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for VerilatorCoverage {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageConverter for VerilatorCoverage {
    fn convert(&self, dat: &Path, info: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--write-info")
            .arg(info)
            .arg(dat)
            .output()
            .map_err(|err| {
                SiteSpawnerError::Conversion(format!("failed to run {}: {err}", self.program))
            })?;

        if output.status.success() {
            return Ok(());
        }
        let merged = merged_output(&output);
        let detail = if merged.is_empty() {
            output.status.to_string()
        } else {
            merged
        };
        Err(SiteSpawnerError::Conversion(format!(
            "failed to convert {}: {detail}",
            dat.display()
        )))
    }
}

fn merged_output(output: &std::process::Output) -> String {
    [&output.stdout, &output.stderr]
        .into_iter()
        .map(|stream| String::from_utf8_lossy(stream).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inputs of a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Directory searched recursively for raw coverage data.
    pub dat_dir: PathBuf,
    /// Directory receiving the summaries; next to each input when absent.
    #[serde(default)]
    pub info_dir: Option<PathBuf>,
    /// Glob pattern matched against file names (`*`, `?`, `[...]`).
    pub pattern: String,
}

/// Convert every matching file under `options.dat_dir` with
/// `verilator_coverage`, creating the output directory if given.
pub fn convert_data(options: &ConvertOptions) -> Result<Vec<PathBuf>> {
    let fs = StdFileSystem::new();
    if let Some(dir) = &options.info_dir {
        fs.create_dir_all(dir)?;
    }
    convert_coverage_data(
        &fs,
        &VerilatorCoverage::new(),
        &options.dat_dir,
        options.info_dir.as_deref(),
        &options.pattern,
    )
}

/// Convert every file under `dat_dir`, at any depth and hidden directories
/// included, whose name matches the glob `pattern`.
///
/// Returns the written summary paths. Finding no data is an error; the first
/// failed conversion aborts the run.
pub fn convert_coverage_data<F, C>(
    fs: &F,
    converter: &C,
    dat_dir: &Path,
    out_dir: Option<&Path>,
    pattern: &str,
) -> Result<Vec<PathBuf>>
where
    F: FileSystem,
    C: CoverageConverter,
{
    let files = if fs.is_dir(dat_dir) {
        fs.find_files(dat_dir, pattern)?
    } else {
        Vec::new()
    };

    if files.is_empty() {
        error!("No '{pattern}' files found in {}", dat_dir.display());
        return Err(SiteSpawnerError::NoCoverageData(dat_dir.to_path_buf()));
    }

    info!("converting {} coverage data files", files.len());
    let mut written = Vec::with_capacity(files.len());
    for dat in files {
        let info = info_path(&dat, out_dir);
        converter.convert(&dat, &info)?;
        debug!("Conversion: {} -> {} SUCCEEDED", dat.display(), info.display());
        written.push(info);
    }
    Ok(written)
}

/// Summary path for `dat`: `.dat` replaced by `.info` in the file name,
/// placed in `out_dir` or next to the input.
pub fn info_path(dat: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = dat
        .file_name()
        .map(|name| name.to_string_lossy().replace(".dat", ".info"))
        .unwrap_or_default();
    match out_dir {
        Some(dir) => dir.join(name),
        None => dat.with_file_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CoverageConverter, DEFAULT_PATTERN, MockCoverageConverter, VerilatorCoverage,
        convert_coverage_data, info_path,
    };
    use crate::error::SiteSpawnerError;
    use crate::fs::test_support::temp_dir;
    use crate::fs::{MockFileSystem, StdFileSystem};
    use std::sync::{Arc, Mutex};
    use std::path::{Path, PathBuf};

    #[test]
    fn finds_data_in_hidden_and_nested_directories() {
        let root = temp_dir("convert_find");
        let hidden = root.join(".run").join("unit");
        std::fs::create_dir_all(&hidden).expect("create hidden dir");
        std::fs::write(hidden.join("coverage.dat"), "").expect("write hidden data");
        std::fs::write(root.join("coverage_smoke_1.dat"), "").expect("write data");
        std::fs::write(root.join("coverage_smoke_1.info"), "").expect("write summary");

        let converted = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&converted);
        let mut converter = MockCoverageConverter::new();
        converter.expect_convert().returning(move |dat, _| {
            seen.lock().expect("lock").push(dat.to_path_buf());
            Ok(())
        });

        let written = convert_coverage_data(
            &StdFileSystem::new(),
            &converter,
            &root,
            None,
            DEFAULT_PATTERN,
        )
        .expect("convert");
        assert_eq!(
            *converted.lock().expect("lock"),
            vec![hidden.join("coverage.dat"), root.join("coverage_smoke_1.dat")]
        );
        assert_eq!(
            written,
            vec![hidden.join("coverage.info"), root.join("coverage_smoke_1.info")]
        );

        let error = convert_coverage_data(
            &StdFileSystem::new(),
            &converter,
            &root,
            None,
            "coverage_[0-9].dat",
        )
        .expect_err("no single-digit data");
        assert!(matches!(error, SiteSpawnerError::NoCoverageData(_)));

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    #[test]
    fn info_path_replaces_extension_and_honours_output_dir() {
        let dat = Path::new("/runs/a/coverage_unit.dat");
        assert_eq!(
            info_path(dat, None),
            PathBuf::from("/runs/a/coverage_unit.info")
        );
        assert_eq!(
            info_path(dat, Some(Path::new("/info"))),
            PathBuf::from("/info/coverage_unit.info")
        );
    }

    #[test]
    fn converts_every_found_file_into_output_dir() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().returning(|_| true);
        fs.expect_find_files()
            .withf(|root, pattern| root == Path::new("/runs") && pattern == DEFAULT_PATTERN)
            .returning(|_, _| {
                Ok(vec![
                    PathBuf::from("/runs/a/coverage_unit.dat"),
                    PathBuf::from("/runs/b/coverage_smoke.dat"),
                ])
            });
        let mut converter = MockCoverageConverter::new();
        converter
            .expect_convert()
            .withf(|dat, info| {
                dat.extension().is_some_and(|ext| ext == "dat")
                    && info.parent() == Some(Path::new("/info"))
            })
            .times(2)
            .returning(|_, _| Ok(()));

        let written = convert_coverage_data(
            &fs,
            &converter,
            Path::new("/runs"),
            Some(Path::new("/info")),
            DEFAULT_PATTERN,
        )
        .expect("convert");
        assert_eq!(
            written,
            vec![
                PathBuf::from("/info/coverage_unit.info"),
                PathBuf::from("/info/coverage_smoke.info"),
            ]
        );
    }

    #[test]
    fn no_matching_files_is_an_error() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().returning(|_| true);
        fs.expect_find_files().returning(|_, _| Ok(Vec::new()));
        let mut converter = MockCoverageConverter::new();
        converter.expect_convert().never();

        let error = convert_coverage_data(&fs, &converter, Path::new("/runs"), None, DEFAULT_PATTERN)
            .expect_err("no data");
        assert!(matches!(error, SiteSpawnerError::NoCoverageData(_)));
    }

    #[test]
    fn failed_conversion_stops_the_run() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().returning(|_| true);
        fs.expect_find_files().returning(|_, _| {
            Ok(vec![
                PathBuf::from("/runs/coverage_a.dat"),
                PathBuf::from("/runs/coverage_b.dat"),
            ])
        });
        let mut converter = MockCoverageConverter::new();
        converter
            .expect_convert()
            .times(1)
            .returning(|dat, _| {
                Err(SiteSpawnerError::Conversion(format!(
                    "failed to convert {}",
                    dat.display()
                )))
            });

        let error = convert_coverage_data(&fs, &converter, Path::new("/runs"), None, DEFAULT_PATTERN)
            .expect_err("conversion fails");
        assert_eq!(error.to_string(), "conversion failed: failed to convert /runs/coverage_a.dat");
    }

    #[test]
    fn missing_program_is_a_conversion_error() {
        let converter = VerilatorCoverage::with_program("sitespawner-missing-converter");
        let error = converter
            .convert(Path::new("coverage.dat"), Path::new("coverage.info"))
            .expect_err("missing program");
        assert!(matches!(error, SiteSpawnerError::Conversion(_)));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_success() {
        let dat = Path::new("coverage.dat");
        let info = Path::new("coverage.info");
        assert!(VerilatorCoverage::with_program("true").convert(dat, info).is_ok());
        let error = VerilatorCoverage::with_program("false")
            .convert(dat, info)
            .expect_err("non-zero exit");
        assert!(error.to_string().contains("failed to convert coverage.dat"));
    }
}
