//! Run report formatting for SiteSpawner commands.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::genhtml::GenhtmlSummary;

/// Outcome of one command run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Command that produced the report.
    pub command: String,
    /// Directory the command wrote into or read from.
    pub target: PathBuf,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
    /// Inputs skipped without failing the run.
    pub skipped: Vec<PathBuf>,
}

impl RunReport {
    /// Create an empty report.
    pub fn new(command: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            target: target.into(),
            written: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Report of a dashboard generation run into `output_dir`.
    pub fn from_genhtml(summary: GenhtmlSummary, output_dir: &Path) -> Self {
        Self {
            command: "genhtml".to_string(),
            target: output_dir.to_path_buf(),
            written: summary.written,
            skipped: summary.skipped,
        }
    }
}

/// Render run reports as Markdown.
pub fn render_markdown(reports: &[RunReport]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# SiteSpawner Report\n");
    for report in reports {
        let _ = writeln!(output, "## {}\n", report.command);
        let _ = writeln!(output, "- Target: `{}`", report.target.display());
        let _ = writeln!(output, "- Written: {}", report.written.len());
        let _ = writeln!(output, "- Skipped: {}\n", report.skipped.len());
        append_paths(&mut output, "Written files", &report.written, "No files written.");
        append_paths(&mut output, "Skipped", &report.skipped, "Nothing skipped.");
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn append_paths(output: &mut String, title: &str, paths: &[PathBuf], empty_message: &str) {
    if paths.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for path in paths {
        let _ = writeln!(output, "- `{}`", path.display());
    }
    let _ = writeln!(output);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        let summary = GenhtmlSummary {
            written: vec![
                PathBuf::from("/out/index_alu.sv.html"),
                PathBuf::from("/out/index.html"),
            ],
            skipped: vec![PathBuf::from("/proj/src/top.sv")],
        };
        RunReport::from_genhtml(summary, Path::new("/out"))
    }

    #[test]
    fn renders_markdown_with_written_and_skipped_files() {
        let output = render_markdown(&[sample_report()]);
        assert!(output.starts_with("# SiteSpawner Report"));
        assert!(output.contains("## genhtml"));
        assert!(output.contains("- Written: 2"));
        assert!(output.contains("- `/out/index.html`"));
        assert!(output.contains("### Skipped\n- `/proj/src/top.sv`"));
    }

    #[test]
    fn renders_empty_lists_with_placeholder() {
        let report = RunReport::new("convert", "/runs");
        let output = render_markdown(&[report]);
        assert!(output.contains("No files written."));
        assert!(output.contains("Nothing skipped."));
    }

    #[test]
    fn renders_json_payload() {
        let json = render_json(&vec![sample_report()]).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert!(parsed.is_array());
        assert_eq!(parsed[0]["command"], "genhtml");
        assert_eq!(parsed[0]["skipped"][0], "/proj/src/top.sv");
    }
}
