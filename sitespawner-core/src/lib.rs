#![deny(missing_docs)]
//! SiteSpawner core library.
//!
//! Parses line-coverage summaries, aggregates them per directory and per
//! file, and renders the static HTML coverage dashboard and its Markdown
//! index pages.

pub mod aggregate;
pub mod color;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fragment;
pub mod fs;
pub mod genhtml;
pub mod index;
pub mod parser;
pub mod render;
pub mod report;
pub mod template;

pub use aggregate::{
    fold_directory_lists, group_by_directory, group_by_file_within_directory, resolve_path, unify,
};
pub use color::{color_for, gradient};
pub use convert::{
    ConvertOptions, CoverageConverter, DEFAULT_PATTERN, VerilatorCoverage, convert_coverage_data,
    convert_data,
};
pub use domain::{CoverageCell, CoverageRecord, CoverageTable, TOTAL_KEY};
pub use error::{Result, SiteSpawnerError};
pub use fragment::{GcovHtmlFragments, SourceFragments};
pub use fs::{FileSystem, StdFileSystem};
pub use genhtml::{GenhtmlOptions, GenhtmlSummary, genhtml, genhtml_with};
pub use index::{GenerateOptions, generate, make_coverage_report_index, make_dev_index};
pub use parser::{parse_summaries, parse_summary};
pub use render::{Breadcrumb, ProjectMetadata, ReportRenderer};
pub use report::{RunReport, render_json, render_markdown};
pub use template::{HandlebarsRenderer, TemplateRenderer};
