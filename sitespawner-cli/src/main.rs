#![deny(missing_docs)]
//! SiteSpawner command-line interface.
//!
//! Generates static HTML coverage dashboards, converts raw coverage data and
//! renders the Markdown index of published dashboards.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use sitespawner_core::{
    ConvertOptions, DEFAULT_PATTERN, GenerateOptions, GenhtmlOptions, ProjectMetadata, RunReport,
    convert_data, generate, genhtml, render_json, render_markdown,
};
use std::fmt::Write;
use std::path::PathBuf;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "sitespawner", version, about = "SiteSpawner coverage dashboard generator")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Args, Clone)]
struct MetadataArgs {
    /// Project name shown in page headers.
    #[arg(long, env = "SITESPAWNER_PROJECT_NAME", default_value = "Project")]
    project_name: String,
    /// Logo image shown in page headers.
    #[arg(long, env = "SITESPAWNER_LOGO_SRC")]
    logo_src: Option<String>,
    /// Link target of the logo.
    #[arg(long, env = "SITESPAWNER_LOGO_HREF")]
    logo_href: Option<String>,
}

#[derive(Args, Clone)]
struct GenhtmlArgs {
    /// Coverage summary files, named `<prefix>_<test type>.info`.
    #[arg(required = true)]
    input_files: Vec<PathBuf>,
    /// Source directory the summaries refer to.
    #[arg(long)]
    src_path: PathBuf,
    /// Existing directory receiving the pages.
    #[arg(long)]
    output_dir: PathBuf,
    /// Label of the test run.
    #[arg(long)]
    test_name: String,
    /// LCOV `genhtml` output mirroring the source directory.
    #[arg(long)]
    html_src_dir: PathBuf,
    /// Directory of templates overriding the built-in ones.
    #[arg(long)]
    templates: Option<PathBuf>,
    #[command(flatten)]
    metadata: MetadataArgs,
}

#[derive(Args, Clone)]
struct ConvertArgs {
    /// Directory searched recursively for raw coverage data.
    #[arg(long)]
    dat_dir: PathBuf,
    /// Directory receiving the summaries (defaults to next to each input).
    #[arg(long)]
    info_dir: Option<PathBuf>,
    /// File name pattern of raw coverage data.
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,
}

#[derive(Args, Clone)]
struct GenerateArgs {
    /// Directory of templates overriding the built-in ones.
    #[arg(long)]
    templates: Option<PathBuf>,
    /// Directory holding `main` and `dev/<branch>` report sets.
    #[arg(long)]
    root: PathBuf,
    /// Directory receiving the Markdown pages.
    #[arg(long)]
    output: PathBuf,
    /// Link rendered documentation next to the dashboards.
    #[arg(long)]
    include_documentation: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the HTML coverage dashboard from `*.info` summaries.
    Genhtml {
        #[command(flatten)]
        args: GenhtmlArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Convert raw coverage data (`*.dat`) into `*.info` summaries.
    Convert {
        #[command(flatten)]
        args: ConvertArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Render the Markdown index of published dashboards.
    Generate {
        #[command(flatten)]
        args: GenerateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli.command)
}

#[cfg(test)]
fn main() {}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn run(command: Commands) -> CliResult<()> {
    let (report, output) = match command {
        Commands::Genhtml { args, report } => (
            run_step("Generate HTML Coverage Report", || run_genhtml(args))?,
            report,
        ),
        Commands::Convert { args, report } => (
            run_step("Convert Coverage Data: *.dat -> *.info", || {
                run_convert(args)
            })?,
            report,
        ),
        Commands::Generate { args, report } => (
            run_step("Generate Markdown Dashboard Index", || run_generate(args))?,
            report,
        ),
    };
    emit_reports(&[report], &output)
}

fn run_step<T>(
    name: &str,
    step: impl FnOnce() -> sitespawner_core::Result<T>,
) -> CliResult<T> {
    info!("{name}");
    match step() {
        Ok(value) => {
            info!("{name} SUCCESS");
            Ok(value)
        }
        Err(err) => {
            error!("{name} FAILED");
            Err(err.into())
        }
    }
}

fn genhtml_options(args: GenhtmlArgs) -> GenhtmlOptions {
    GenhtmlOptions {
        input_files: args.input_files,
        src_path: args.src_path,
        output_dir: args.output_dir,
        test_name: args.test_name,
        html_src_dir: args.html_src_dir,
        metadata: ProjectMetadata {
            project_name: args.metadata.project_name,
            logo_src: args.metadata.logo_src,
            logo_href: args.metadata.logo_href,
        },
        templates_dir: args.templates,
    }
}

fn run_genhtml(args: GenhtmlArgs) -> sitespawner_core::Result<RunReport> {
    let options = genhtml_options(args);
    let summary = genhtml(&options)?;
    Ok(RunReport::from_genhtml(summary, &options.output_dir))
}

fn run_convert(args: ConvertArgs) -> sitespawner_core::Result<RunReport> {
    let options = ConvertOptions {
        dat_dir: args.dat_dir,
        info_dir: args.info_dir,
        pattern: args.pattern,
    };
    let mut report = RunReport::new("convert", &options.dat_dir);
    report.written = convert_data(&options)?;
    Ok(report)
}

fn run_generate(args: GenerateArgs) -> sitespawner_core::Result<RunReport> {
    let options = GenerateOptions {
        templates_dir: args.templates,
        root: args.root,
        output: args.output,
        include_documentation: args.include_documentation,
    };
    let mut report = RunReport::new("generate", &options.output);
    report.written = generate(&options)?;
    Ok(report)
}

fn emit_reports(reports: &[RunReport], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_text(reports),
        OutputFormat::Markdown => render_markdown(reports),
        OutputFormat::Json => render_json(reports)?,
    };
    emit_output(output, contents)
}

fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_text(reports: &[RunReport]) -> String {
    let mut output = String::new();
    for report in reports {
        let _ = writeln!(output, "Command: {}", report.command);
        let _ = writeln!(output, "Target: {}", report.target.display());
        if report.written.is_empty() {
            let _ = writeln!(output, "Written: none");
        } else {
            let _ = writeln!(output, "Written:");
            for path in &report.written {
                let _ = writeln!(output, "- {}", path.display());
            }
        }
        if !report.skipped.is_empty() {
            let _ = writeln!(output, "Skipped:");
            for path in &report.skipped {
                let _ = writeln!(output, "- {}", path.display());
            }
        }
        let _ = writeln!(output);
    }
    output
}
