//! HTML coverage dashboard generation from `*.info` summaries.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    fold_directory_lists, group_by_directory, group_by_file_within_directory, relative_segments,
    resolve_path, unify,
};
use crate::error::{Result, SiteSpawnerError};
use crate::fragment::{GcovHtmlFragments, SourceFragments};
use crate::fs::{FileSystem, StdFileSystem};
use crate::parser::parse_summaries;
use crate::render::{Breadcrumb, ProjectMetadata, ReportRenderer, page_file_name};
use crate::template::{HandlebarsRenderer, TemplateRenderer};

/// Name of the top-level page.
pub const ROOT_PAGE: &str = "index.html";

/// Inputs of a dashboard generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenhtmlOptions {
    /// Coverage summary files, one test type each.
    pub input_files: Vec<PathBuf>,
    /// Source directory; its parent is the code root pages are relative to.
    pub src_path: PathBuf,
    /// Existing directory receiving the pages.
    pub output_dir: PathBuf,
    /// Label of the test run shown on every page.
    pub test_name: String,
    /// Directory of LCOV `genhtml` output mirroring `src_path`.
    pub html_src_dir: PathBuf,
    /// Project branding.
    #[serde(flatten)]
    pub metadata: ProjectMetadata,
    /// Directory of templates overriding the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenhtmlSummary {
    /// Pages written, in write order.
    pub written: Vec<PathBuf>,
    /// Source files whose page was skipped for lack of an annotation.
    pub skipped: Vec<PathBuf>,
}

/// Generate the dashboard using the local filesystem, the built-in templates
/// (optionally overridden) and `genhtml` annotations.
pub fn genhtml(options: &GenhtmlOptions) -> Result<GenhtmlSummary> {
    let fs = StdFileSystem::new();
    let mut templates = HandlebarsRenderer::coverage_report()?;
    if let Some(dir) = &options.templates_dir {
        templates.load_dir(dir)?;
    }
    let fragments = GcovHtmlFragments::new(fs.clone(), &options.html_src_dir, &options.src_path)?;
    genhtml_with(&fs, &fragments, &templates, options)
}

/// Generate the dashboard with explicit collaborators.
///
/// Pages are written in three phases: one per source file, one per
/// directory, then the root page. A source file without an annotation is
/// skipped; any other error aborts the run, leaving already written pages in
/// place.
pub fn genhtml_with<F, S, R>(
    fs: &F,
    fragments: &S,
    templates: &R,
    options: &GenhtmlOptions,
) -> Result<GenhtmlSummary>
where
    F: FileSystem,
    S: SourceFragments,
    R: TemplateRenderer,
{
    if !fs.is_dir(&options.output_dir) {
        return Err(SiteSpawnerError::OutputDirectoryMissing(
            options.output_dir.clone(),
        ));
    }

    let table = unify(parse_summaries(fs, &options.input_files)?);

    // Summaries must list full paths, so the code root sits one level above
    // the source directory.
    let src_prefix = resolve_path(&options.src_path)?;
    let code_root = src_prefix
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| src_prefix.clone());
    let root_name = display_name(&code_root);
    let directories = group_by_directory(&table, &code_root)?;

    let renderer = ReportRenderer::new(templates, options.metadata.clone(), &options.test_name);
    let mut summary = GenhtmlSummary::default();

    info!("rendering {} source file pages", table.subjects.len());
    for (subject, record) in &table.subjects {
        let source = Path::new(subject);
        let breadcrumb = Breadcrumb {
            root_name: root_name.clone(),
            path_segments: relative_segments(source, &code_root)?,
        };
        let Some(fragment) = fragments.fetch_source_fragment(source)? else {
            summary.skipped.push(source.to_path_buf());
            continue;
        };
        debug!("generating page for {subject}");
        let page = renderer.source_page(record, &breadcrumb, &fragment)?;
        let name = page_file_name(&display_name(source));
        write_page(fs, &options.output_dir, &name, &page, &mut summary)?;
    }

    info!("rendering {} directory pages", directories.subjects.len());
    for directory in directories.subjects.keys() {
        let scoped = group_by_file_within_directory(&table, directory, &code_root)?;
        let breadcrumb = Breadcrumb {
            root_name: root_name.clone(),
            path_segments: directory.split('/').map(str::to_string).collect(),
        };
        let page = renderer.full_page(&scoped, &breadcrumb, true)?;
        write_page(
            fs,
            &options.output_dir,
            &page_file_name(directory),
            &page,
            &mut summary,
        )?;
    }

    info!("rendering root page");
    let folded = fold_directory_lists(&directories);
    let breadcrumb = Breadcrumb {
        root_name,
        path_segments: vec![display_name(&src_prefix)],
    };
    let page = renderer.full_page(&folded, &breadcrumb, true)?;
    write_page(fs, &options.output_dir, ROOT_PAGE, &page, &mut summary)?;

    Ok(summary)
}

fn write_page<F: FileSystem>(
    fs: &F,
    output_dir: &Path,
    name: &str,
    page: &str,
    summary: &mut GenhtmlSummary,
) -> Result<()> {
    let path = output_dir.join(name);
    fs.write(&path, page)?;
    debug!("wrote {}", path.display());
    summary.written.push(path);
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
