//! Template rendering backends.

use std::path::Path;

use handlebars::Handlebars;
use log::debug;
use serde_json::Value;

use crate::error::{Result, SiteSpawnerError};

/// Built-in coverage report templates, keyed by their file name.
pub const COVERAGE_TEMPLATES: [(&str, &str); 4] = [
    (
        "main_table.html",
        include_str!("../templates/coverage_report/main_table.html"),
    ),
    (
        "summary_table.html",
        include_str!("../templates/coverage_report/summary_table.html"),
    ),
    (
        "coverage_report.html",
        include_str!("../templates/coverage_report/coverage_report.html"),
    ),
    (
        "src_view.html",
        include_str!("../templates/coverage_report/src_view.html"),
    ),
];

/// Renders a named template against a data object.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer {
    /// Render template `name` with `data`.
    fn render(&self, name: &str, data: &Value) -> Result<String>;
}

mod helpers {
    use handlebars::handlebars_helper;

    use crate::color::color_for;

    handlebars_helper!(get_color: |value: u64, total: u64| color_for(value, total));
}

use helpers::get_color;

/// Handlebars-backed renderer with the `get_color` helper registered.
#[derive(Debug)]
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Renderer with no templates, escaping output for HTML.
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("get_color", Box::new(get_color));
        Self { registry }
    }

    /// Renderer with the built-in coverage report templates.
    pub fn coverage_report() -> Result<Self> {
        let mut renderer = Self::new();
        for (name, source) in COVERAGE_TEMPLATES {
            renderer.register_template(name, source)?;
        }
        Ok(renderer)
    }

    /// Renderer for Markdown pages, with HTML escaping disabled.
    pub fn markdown() -> Self {
        let mut renderer = Self::new();
        renderer.registry.register_escape_fn(handlebars::no_escape);
        renderer
    }

    /// Register or replace a template.
    pub fn register_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry
            .register_template_string(name, source)
            .map_err(SiteSpawnerError::from)
    }

    /// Register every `*.html` and `*.md` file in `dir` under its file name,
    /// replacing templates of the same name.
    pub fn load_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "html" | "md"));
            if !is_template || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            debug!("registering template {name} from {}", path.display());
            self.register_template(name, &source)?;
        }
        Ok(())
    }

    /// Whether a template with `name` is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(SiteSpawnerError::from)
    }
}
