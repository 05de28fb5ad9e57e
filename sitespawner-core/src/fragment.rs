//! Source annotation fragments produced by LCOV's `genhtml`.
//!
//! `genhtml` writes one `<basename>.gcov.html` page per source file; the
//! annotated source listing is the second-to-last `<table>` of that page.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::aggregate::resolve_path;
use crate::error::{Result, SiteSpawnerError};
use crate::fs::FileSystem;

/// Suffix `genhtml` appends to source file names.
pub const ANNOTATION_SUFFIX: &str = ".gcov.html";

/// Lookup of pre-rendered per-line source views.
#[cfg_attr(test, mockall::automock)]
pub trait SourceFragments {
    /// Markup to embed for `source`, or `None` when no annotation exists.
    fn fetch_source_fragment(&self, source: &Path) -> Result<Option<String>>;
}

/// Reads fragments from a `genhtml` output directory mirroring the source
/// tree.
#[derive(Debug, Clone)]
pub struct GcovHtmlFragments<F: FileSystem> {
    fs: F,
    html_src_dir: PathBuf,
    src_prefix: PathBuf,
}

impl<F: FileSystem> GcovHtmlFragments<F> {
    /// Create an adapter; `src_prefix` is the source root the annotation
    /// directory mirrors.
    pub fn new(fs: F, html_src_dir: impl Into<PathBuf>, src_prefix: &Path) -> Result<Self> {
        Ok(Self {
            fs,
            html_src_dir: html_src_dir.into(),
            src_prefix: resolve_path(src_prefix)?,
        })
    }

    /// Location of the annotation page for `source`.
    pub fn annotation_path(&self, source: &Path) -> Result<PathBuf> {
        let resolved = resolve_path(source)?;
        let resolution_error = || SiteSpawnerError::PathResolution {
            path: resolved.clone(),
            root: self.src_prefix.clone(),
        };
        let name = resolved.file_name().ok_or_else(resolution_error)?;
        let inner = resolved
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.src_prefix).ok())
            .ok_or_else(resolution_error)?;

        let mut html_name = name.to_os_string();
        html_name.push(ANNOTATION_SUFFIX);
        Ok(self.html_src_dir.join(inner).join(html_name))
    }
}

impl<F: FileSystem> SourceFragments for GcovHtmlFragments<F> {
    fn fetch_source_fragment(&self, source: &Path) -> Result<Option<String>> {
        let path = self.annotation_path(source)?;
        if !self.fs.is_file(&path) {
            warn!("Not found: {}", path.display());
            return Ok(None);
        }

        let html = self.fs.read_to_string(&path)?;
        let fragment = select_annotation_table(&html);
        match fragment {
            Some(fragment) => {
                debug!("using annotation table from {}", path.display());
                Ok(Some(fragment.to_string()))
            }
            None => {
                warn!("No annotation table in {}", path.display());
                Ok(None)
            }
        }
    }
}

/// The second-to-last `<table>` element of `html`, in document order.
///
/// Nested tables count as separate elements. Returns `None` when the page has
/// fewer than two tables.
pub fn select_annotation_table(html: &str) -> Option<&str> {
    let spans = table_spans(html);
    let (start, end) = *spans.iter().rev().nth(1)?;
    Some(&html[start..end])
}

const RAW_TEXT_ELEMENTS: [(&str, &str); 2] = [("<script", "</script"), ("<style", "</style")];

fn table_spans(html: &str) -> Vec<(usize, usize)> {
    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        let rest = &lower[start..];
        if let Some(end) = opaque_section_end(&lower, start) {
            pos = end;
        } else if is_tag(rest, "<table") {
            open.push(start);
            pos = start + "<table".len();
        } else if is_tag(rest, "</table") {
            let end = rest.find('>').map_or(lower.len(), |index| start + index + 1);
            if let Some(opened) = open.pop() {
                spans.push((opened, end));
            }
            pos = end;
        } else {
            pos = start + 1;
        }
    }

    spans.extend(open.into_iter().map(|opened| (opened, lower.len())));
    spans.sort_by_key(|(start, _)| *start);
    spans
}

/// End of the comment or script/style element starting at `start`, whose
/// contents are not markup.
fn opaque_section_end(lower: &str, start: usize) -> Option<usize> {
    let rest = &lower[start..];
    if let Some(body) = rest.strip_prefix("<!--") {
        let end = body
            .find("-->")
            .map_or(lower.len(), |index| start + "<!--".len() + index + "-->".len());
        return Some(end);
    }
    let (_, close) = RAW_TEXT_ELEMENTS
        .iter()
        .find(|(open, _)| is_tag(rest, open))?;
    let end = rest
        .find(close)
        .and_then(|index| rest[index..].find('>').map(|tail| start + index + tail + 1));
    Some(end.unwrap_or(lower.len()))
}

fn is_tag(rest: &str, name: &str) -> bool {
    rest.starts_with(name)
        && rest[name.len()..]
            .chars()
            .next()
            .is_none_or(|next| next.is_ascii_whitespace() || next == '>' || next == '/')
}
