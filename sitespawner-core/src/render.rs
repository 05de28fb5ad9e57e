//! Coverage report page rendering.
//!
//! The renderer only prepares template data; markup comes from the
//! [`TemplateRenderer`] it is given.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::color::color_for;
use crate::domain::{CoverageCell, CoverageRecord, CoverageTable};
use crate::error::Result;
use crate::template::TemplateRenderer;

/// Template of the full coverage table.
pub const MAIN_TABLE_TEMPLATE: &str = "main_table.html";
/// Template of one per-test-type summary badge.
pub const SUMMARY_TEMPLATE: &str = "summary_table.html";
/// Template of a directory or root page.
pub const REPORT_TEMPLATE: &str = "coverage_report.html";
/// Template of a source file page.
pub const SOURCE_VIEW_TEMPLATE: &str = "src_view.html";

/// Format of the timestamp shown on every page.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

const NAME_WIDTH: f64 = 20.0;
const RAW_WIDTHS: [f64; 3] = [40.0, 20.0, 20.0];

/// Project branding shown in the page header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    /// Display name of the project.
    pub project_name: String,
    /// Logo image source.
    pub logo_src: Option<String>,
    /// Link target of the logo.
    pub logo_href: Option<String>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "Project".to_string(),
            logo_src: None,
            logo_href: None,
        }
    }
}

/// Navigation path of a page: the code root name followed by path segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Name of the code root directory.
    pub root_name: String,
    /// Ordered segments below the root.
    pub path_segments: Vec<String>,
}

/// File name of the page reporting on `subject`.
///
/// Directory separators are flattened so every page lives in one directory:
/// `core/alu` becomes `index_core_alu.html`.
pub fn page_file_name(subject: &str) -> String {
    format!("index_{}.html", subject.replace('/', "_"))
}

#[derive(Debug, Serialize)]
struct TableCell {
    cov_type: String,
    hit: u64,
    found: u64,
    ratio: String,
    color: String,
}

#[derive(Debug, Serialize)]
struct TableRow {
    name: String,
    link: Option<String>,
    cells: Vec<TableCell>,
}

#[derive(Debug, Serialize)]
struct TableContext {
    cov_types: Vec<String>,
    width_cov_desc: f64,
    name_w: f64,
    rate_w: f64,
    hit_w: f64,
    widths_arr: Vec<String>,
    links: bool,
    rows: Vec<TableRow>,
}

#[derive(Debug, Serialize)]
struct SummaryContext {
    new_row: bool,
    cov_type_token: String,
    color_token: String,
    hitrate_token: String,
    hit_token: String,
    total_token: String,
}

#[derive(Debug, Serialize)]
struct SummaryEntry {
    cov_type: String,
    html: String,
}

/// Builds coverage pages from coverage tables.
pub struct ReportRenderer<'a, R: TemplateRenderer> {
    templates: &'a R,
    metadata: ProjectMetadata,
    test_name: String,
    timestamp: String,
}

impl<'a, R: TemplateRenderer> ReportRenderer<'a, R> {
    /// Create a renderer stamping pages with the current local time.
    pub fn new(templates: &'a R, metadata: ProjectMetadata, test_name: impl Into<String>) -> Self {
        Self {
            templates,
            metadata,
            test_name: test_name.into(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Replace the timestamp shown on pages.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Render the coverage table: one row per subject, one column group per
    /// test type in descending name order. The total record is not a row.
    pub fn full_table(&self, table: &CoverageTable, links: bool) -> Result<String> {
        let cov_types = descending_test_types(table);
        let num_tests = cov_types.len().max(1) as f64;
        let cov_container = (100.0 - NAME_WIDTH) / num_tests;
        let hit_w = cov_container / 4.0;

        let rows = table
            .subjects
            .iter()
            .map(|(subject, record)| TableRow {
                name: subject.clone(),
                link: links.then(|| page_file_name(subject)),
                cells: cov_types
                    .iter()
                    .map(|cov_type| table_cell(cov_type, record))
                    .collect(),
            })
            .collect();

        let context = TableContext {
            width_cov_desc: RAW_WIDTHS.iter().sum::<f64>() / num_tests,
            name_w: NAME_WIDTH,
            rate_w: cov_container - hit_w,
            hit_w,
            widths_arr: RAW_WIDTHS
                .iter()
                .map(|width| format!("{:?}%", width / num_tests))
                .collect(),
            links,
            cov_types,
            rows,
        };
        self.templates
            .render(MAIN_TABLE_TEMPLATE, &to_value(&context)?)
    }

    /// Render the summary badge of one test type.
    pub fn summary(&self, cov_type: &str, cell: CoverageCell) -> Result<String> {
        let context = SummaryContext {
            new_row: true,
            cov_type_token: cov_type.to_string(),
            color_token: color_for(cell.hit, cell.found),
            hitrate_token: format_ratio(cell),
            hit_token: cell.hit.to_string(),
            total_token: cell.found.to_string(),
        };
        self.templates
            .render(SUMMARY_TEMPLATE, &to_value(&context)?)
    }

    /// Render a directory or root page: the coverage table of `table`,
    /// summaries from its total record, and navigation.
    pub fn full_page(
        &self,
        table: &CoverageTable,
        breadcrumb: &Breadcrumb,
        links: bool,
    ) -> Result<String> {
        let mut context = self.page_context(&table.total, breadcrumb)?;
        context.insert(
            "fulltable_token".to_string(),
            Value::String(self.full_table(table, links)?),
        );
        self.templates
            .render(REPORT_TEMPLATE, &Value::Object(context))
    }

    /// Render a source file page embedding the annotated listing `fragment`.
    pub fn source_page(
        &self,
        record: &CoverageRecord,
        breadcrumb: &Breadcrumb,
        fragment: &str,
    ) -> Result<String> {
        let mut context = self.page_context(record, breadcrumb)?;
        context.insert(
            "src_file_table".to_string(),
            Value::String(fragment.to_string()),
        );
        self.templates
            .render(SOURCE_VIEW_TEMPLATE, &Value::Object(context))
    }

    fn page_context(
        &self,
        summary_record: &CoverageRecord,
        breadcrumb: &Breadcrumb,
    ) -> Result<Map<String, Value>> {
        let mut context = Map::new();
        context.insert("header_token".to_string(), Value::from("Full"));
        context.insert(
            "project_name".to_string(),
            Value::from(self.metadata.project_name.clone()),
        );
        context.insert(
            "logo_src".to_string(),
            to_value(&self.metadata.logo_src)?,
        );
        context.insert(
            "logo_href".to_string(),
            to_value(&self.metadata.logo_href)?,
        );
        context.insert(
            "root_name".to_string(),
            Value::from(breadcrumb.root_name.clone()),
        );
        context.insert(
            "path_segments".to_string(),
            to_value(&breadcrumb.path_segments)?,
        );
        context.insert(
            "testname_token".to_string(),
            Value::from(self.test_name.clone()),
        );
        context.insert("time_token".to_string(), Value::from(self.timestamp.clone()));

        let mut summaries = Vec::new();
        for (cov_type, cell) in summary_record.iter().rev() {
            let html = self.summary(cov_type, *cell)?;
            context.insert(
                format!("{cov_type}_summary_token"),
                Value::String(html.clone()),
            );
            summaries.push(SummaryEntry {
                cov_type: cov_type.clone(),
                html,
            });
        }
        context.insert("summaries".to_string(), to_value(&summaries)?);
        Ok(context)
    }
}

fn descending_test_types(table: &CoverageTable) -> Vec<String> {
    let mut cov_types: Vec<String> = table
        .subjects
        .values()
        .flat_map(|record| record.keys())
        .cloned()
        .collect::<std::collections::BTreeSet<String>>()
        .into_iter()
        .collect();
    cov_types.reverse();
    cov_types
}

fn table_cell(cov_type: &str, record: &CoverageRecord) -> TableCell {
    let cell = record.get(cov_type).copied().unwrap_or_default();
    TableCell {
        cov_type: cov_type.to_string(),
        hit: cell.hit,
        found: cell.found,
        ratio: format_ratio(cell),
        color: color_for(cell.hit, cell.found),
    }
}

fn format_ratio(cell: CoverageCell) -> String {
    format!("{:.1}%", cell.percentage())
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
