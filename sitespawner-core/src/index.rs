//! Markdown index pages listing published coverage dashboards.
//!
//! Reports are expected under `<root>/main` and `<root>/dev/<branch>`, each
//! holding a `coverage_dashboard` directory with one `all` report and one
//! `all_<test>` report per individual test.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::fs::{FileSystem, StdFileSystem};
use crate::template::{HandlebarsRenderer, TemplateRenderer};

/// Directory holding the dashboards of one branch.
pub const COVERAGE_DASHBOARD_DIR: &str = "coverage_dashboard";
/// Template of a branch's dashboard index.
pub const COVERAGE_DASHBOARD_TEMPLATE: &str = "coverage_dashboard.md";
/// Template of the development branch listing.
pub const DEV_TEMPLATE: &str = "dev.md";
/// Template of the main branch page.
pub const MAIN_TEMPLATE: &str = "main.md";

const DASHBOARD_KINDS: [&str; 1] = ["all"];

/// Built-in webpage templates, keyed by their file name.
pub const WEBPAGE_TEMPLATES: [(&str, &str); 3] = [
    (
        COVERAGE_DASHBOARD_TEMPLATE,
        include_str!("../templates/webpage/coverage_dashboard.md"),
    ),
    (DEV_TEMPLATE, include_str!("../templates/webpage/dev.md")),
    (MAIN_TEMPLATE, include_str!("../templates/webpage/main.md")),
];

/// Site files copied verbatim, keyed by their file name.
pub const STATIC_FILES: [(&str, &str); 2] = [
    ("conf.py", include_str!("../templates/webpage/conf.py")),
    ("index.md", include_str!("../templates/webpage/index.md")),
];

/// Inputs of an index generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory of templates overriding the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    /// Directory holding `main` and `dev/<branch>` report sets.
    pub root: PathBuf,
    /// Directory receiving the Markdown pages.
    pub output: PathBuf,
    /// Link rendered documentation next to the dashboards.
    #[serde(default)]
    pub include_documentation: bool,
}

/// Dashboards published for one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardListing {
    /// Reference label of the branch's dashboard page.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Combined report directory per dashboard kind, if present.
    pub summary: BTreeMap<String, Option<String>>,
    /// Per-test report directories per dashboard kind, keyed by test name.
    pub individual: BTreeMap<String, BTreeMap<String, String>>,
}

/// Markdown renderer with the built-in webpage templates, overridden by the
/// templates in `dir` when given.
pub fn webpage_renderer(dir: Option<&Path>) -> Result<HandlebarsRenderer> {
    let mut renderer = HandlebarsRenderer::markdown();
    for (name, source) in WEBPAGE_TEMPLATES {
        renderer.register_template(name, source)?;
    }
    if let Some(dir) = dir {
        renderer.load_dir(dir)?;
    }
    Ok(renderer)
}

/// Collect the dashboards published under `root` for `branch`.
pub fn collect_dashboards<F: FileSystem>(
    fs: &F,
    branch: &str,
    root: &Path,
) -> Result<DashboardListing> {
    let path = root.join(COVERAGE_DASHBOARD_DIR);
    let mut listing = DashboardListing {
        reference: format!("{branch}_coverage_dashboard"),
        ..DashboardListing::default()
    };

    for kind in DASHBOARD_KINDS {
        let summary = fs.is_dir(&path.join(kind)).then(|| kind.to_string());
        listing.summary.insert(kind.to_string(), summary);
        let individual = listing.individual.entry(kind.to_string()).or_default();

        if !fs.is_dir(&path) {
            warn!("Not found {}, skipping", path.display());
            continue;
        }

        let prefix = format!("{kind}_");
        for dir in fs.list_dirs(&path)? {
            let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if let Some(test_name) = name.strip_prefix(&prefix) {
                individual.insert(test_name.to_string(), name.to_string());
            }
        }
    }

    Ok(listing)
}

/// Render `<output>/coverage_dashboard.md` for the reports of `branch` found
/// under `root`, creating `output` if needed.
pub fn make_coverage_report_index<F, R>(
    fs: &F,
    templates: &R,
    branch: &str,
    root: &Path,
    output: &Path,
) -> Result<PathBuf>
where
    F: FileSystem,
    R: TemplateRenderer,
{
    let listing = collect_dashboards(fs, branch, root)?;
    let page = templates.render(COVERAGE_DASHBOARD_TEMPLATE, &serde_json::to_value(&listing)?)?;

    fs.create_dir_all(output)?;
    let path = output.join(COVERAGE_DASHBOARD_TEMPLATE);
    fs.write(&path, &page)?;
    debug!("wrote {}", path.display());
    Ok(path)
}

/// Render `<output>/dev.md` listing the development branches.
pub fn make_dev_index<F, R>(
    fs: &F,
    templates: &R,
    branches: &[String],
    output: &Path,
    include_documentation: bool,
) -> Result<PathBuf>
where
    F: FileSystem,
    R: TemplateRenderer,
{
    let data = json!({
        "branches": branches,
        "include_documentation": include_documentation,
    });
    let page = templates.render(DEV_TEMPLATE, &data)?;
    let path = output.join(DEV_TEMPLATE);
    fs.write(&path, &page)?;
    Ok(path)
}

/// Generate the Markdown site with the local filesystem.
pub fn generate(options: &GenerateOptions) -> Result<Vec<PathBuf>> {
    let templates = webpage_renderer(options.templates_dir.as_deref())?;
    generate_with(&StdFileSystem::new(), &templates, options)
}

/// Generate the Markdown site: one dashboard index for `main` and for every
/// branch under `dev`, the branch listing, the main page, and the static site
/// files. Returns the written files in write order.
pub fn generate_with<F, R>(fs: &F, templates: &R, options: &GenerateOptions) -> Result<Vec<PathBuf>>
where
    F: FileSystem,
    R: TemplateRenderer,
{
    let root = &options.root;
    let output = &options.output;
    let mut written = Vec::new();

    written.push(make_coverage_report_index(
        fs,
        templates,
        "main",
        &root.join("main"),
        &output.join("main"),
    )?);

    let mut branches = Vec::new();
    let dev = root.join("dev");
    if fs.is_dir(&dev) {
        for dir in fs.list_dirs(&dev)? {
            let Some(branch) = dir.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            written.push(make_coverage_report_index(
                fs,
                templates,
                branch,
                &dir,
                &output.join("dev").join(branch),
            )?);
            branches.push(branch.to_string());
        }
    }
    info!("indexed {} development branches", branches.len());

    written.push(make_dev_index(
        fs,
        templates,
        &branches,
        output,
        options.include_documentation,
    )?);

    let main = templates.render(
        MAIN_TEMPLATE,
        &json!({ "include_documentation": options.include_documentation }),
    )?;
    let main_path = output.join(MAIN_TEMPLATE);
    fs.write(&main_path, &main)?;
    written.push(main_path);

    for (name, builtin) in STATIC_FILES {
        let custom = options
            .templates_dir
            .as_ref()
            .map(|dir| dir.join(name))
            .filter(|path| fs.is_file(path));
        let contents = match custom {
            Some(path) => fs.read_to_string(&path)?,
            None => builtin.to_string(),
        };
        let path = output.join(name);
        fs.write(&path, &contents)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::{
        GenerateOptions, STATIC_FILES, collect_dashboards, generate_with, make_dev_index,
        webpage_renderer,
    };
    use crate::fs::test_support::temp_dir;
    use crate::fs::{MockFileSystem, StdFileSystem};
    use crate::template::{MockTemplateRenderer, TemplateRenderer};
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            std::fs::create_dir_all(root.join(dir)).expect("create dir");
        }
    }

    #[test]
    fn collects_summary_and_individual_dashboards() {
        let root = temp_dir("index_collect");
        mkdirs(
            &root,
            &[
                "coverage_dashboard/all",
                "coverage_dashboard/all_unit",
                "coverage_dashboard/all_smoke",
                "coverage_dashboard/other",
            ],
        );
        std::fs::write(root.join("coverage_dashboard/all_file"), "").expect("write file");

        let listing = collect_dashboards(&StdFileSystem::new(), "main", &root).expect("collect");
        assert_eq!(
            serde_json::to_value(&listing).expect("json"),
            json!({
                "ref": "main_coverage_dashboard",
                "summary": {"all": "all"},
                "individual": {"all": {"smoke": "all_smoke", "unit": "all_unit"}},
            })
        );

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    #[test]
    fn missing_dashboard_directory_yields_empty_listing() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().returning(|_| false);
        fs.expect_list_dirs().never();

        let listing = collect_dashboards(&fs, "feature", Path::new("/reports/dev/feature"))
            .expect("collect");
        assert_eq!(
            serde_json::to_value(&listing).expect("json"),
            json!({
                "ref": "feature_coverage_dashboard",
                "summary": {"all": null},
                "individual": {"all": {}},
            })
        );
    }

    #[test]
    fn dev_index_passes_branches_to_template() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let mut templates = MockTemplateRenderer::new();
        templates.expect_render().returning(move |name, data| {
            recorded
                .lock()
                .expect("lock")
                .push((name.to_string(), data.clone()));
            Ok("page".to_string())
        });
        let mut fs = MockFileSystem::new();
        fs.expect_write()
            .withf(|path, contents| path == Path::new("/out/dev.md") && contents == "page")
            .times(1)
            .returning(|_, _| Ok(()));

        let branches = vec!["fix-1".to_string(), "pr-7".to_string()];
        let path = make_dev_index(&fs, &templates, &branches, Path::new("/out"), true)
            .expect("dev index");
        assert_eq!(path, PathBuf::from("/out/dev.md"));

        let calls = seen.lock().expect("lock");
        assert_eq!(calls[0].0, "dev.md");
        assert_eq!(
            calls[0].1,
            json!({"branches": ["fix-1", "pr-7"], "include_documentation": true})
        );
    }

    #[test]
    fn builtin_dashboard_template_links_reports() {
        let renderer = webpage_renderer(None).expect("renderer");
        let page = renderer
            .render(
                "coverage_dashboard.md",
                &json!({
                    "ref": "main_coverage_dashboard",
                    "summary": {"all": "all"},
                    "individual": {"all": {"unit": "all_unit"}},
                }),
            )
            .expect("render");
        assert!(page.starts_with("(main_coverage_dashboard)="));
        assert!(page.contains("(coverage_dashboard/all/index.html)"));
        assert!(page.contains("| unit | [all_unit](coverage_dashboard/all_unit/index.html) |"));
    }

    #[test]
    fn generate_writes_branch_indexes_and_site_files() {
        let root = temp_dir("index_generate");
        let reports = root.join("reports");
        mkdirs(
            &reports,
            &[
                "main/coverage_dashboard/all",
                "dev/pr-2/coverage_dashboard/all_unit",
                "dev/pr-1",
            ],
        );
        let custom = root.join("templates");
        std::fs::create_dir_all(&custom).expect("create templates dir");
        std::fs::write(custom.join("index.md"), "custom index").expect("write template");

        let options = GenerateOptions {
            templates_dir: Some(custom.clone()),
            root: reports,
            output: root.join("site"),
            include_documentation: false,
        };
        let templates = webpage_renderer(Some(custom.as_path())).expect("renderer");
        let written =
            generate_with(&StdFileSystem::new(), &templates, &options).expect("generate");

        let site = root.join("site");
        assert_eq!(
            written,
            vec![
                site.join("main/coverage_dashboard.md"),
                site.join("dev/pr-1/coverage_dashboard.md"),
                site.join("dev/pr-2/coverage_dashboard.md"),
                site.join("dev.md"),
                site.join("main.md"),
                site.join("conf.py"),
                site.join("index.md"),
            ]
        );
        let dev = std::fs::read_to_string(site.join("dev.md")).expect("dev.md");
        assert!(dev.contains("pr-1_coverage_dashboard"));
        assert!(dev.contains("pr-2_coverage_dashboard"));
        assert_eq!(
            std::fs::read_to_string(site.join("index.md")).expect("index.md"),
            "custom index"
        );
        assert_eq!(
            std::fs::read_to_string(site.join("conf.py")).expect("conf.py"),
            STATIC_FILES[0].1
        );

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }
}
