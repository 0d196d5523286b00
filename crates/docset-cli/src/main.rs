//! docset CLI: validate front-matter and cross-references of a Markdown
//! document set.
//!
//! Commands: check, watch, graph, completions

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;

use docset_core::{Schema, SchemaConfig, SourceFile};
use docset_graph::{analyze, check, CheckOptions, FailOn, ReportFormat};

mod watch;

#[derive(Parser)]
#[command(name = "docset")]
#[command(version)]
#[command(about = "Front-matter schema and cross-reference validator for Markdown document sets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate a document set and print a report
    Check {
        #[command(flatten)]
        scan: ScanArgs,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Lowest severity that makes the run exit non-zero
        #[arg(long, value_enum, default_value_t = FailOnArg::Error)]
        fail_on: FailOnArg,
    },
    /// Re-validate whenever a document changes
    Watch {
        #[command(flatten)]
        scan: ScanArgs,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the document graph
    Graph {
        #[command(flatten)]
        scan: ScanArgs,
        /// Graph format
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct ScanArgs {
    /// Root directory of the document set
    #[arg(default_value = ".")]
    root: PathBuf,
    /// Schema file (.yaml, .yml, .json or .toml)
    #[arg(long, env = "DOCSET_SCHEMA")]
    schema: Option<PathBuf>,
    /// Document extensions, overriding the schema's list
    #[arg(long, value_delimiter = ',')]
    ext: Vec<String>,
    /// Worker threads for per-document validation
    #[arg(long, short = 'j', default_value_t = 1)]
    jobs: usize,
}

impl ScanArgs {
    fn options(&self) -> CheckOptions {
        CheckOptions {
            jobs: self.jobs.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            OutputFormat::Text => Self::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailOnArg {
    Error,
    Warning,
}

impl From<FailOnArg> for FailOn {
    fn from(fail_on: FailOnArg) -> Self {
        match fail_on {
            FailOnArg::Error => Self::Error,
            FailOnArg::Warning => Self::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GraphFormat {
    Dot,
    Mermaid,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            scan,
            format,
            fail_on,
        } => cmd_check(&scan, format.into(), fail_on.into()),
        Commands::Watch { scan, format } => watch::run(&scan, format.into()),
        Commands::Graph { scan, format } => cmd_graph(&scan, format),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "docset", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn cmd_check(scan: &ScanArgs, format: ReportFormat, fail_on: FailOn) -> Result<ExitCode> {
    let schema = load_schema(scan)?;
    let inputs = discover(&scan.root, &schema)?;
    let report = check(&inputs, &schema, &scan.options());

    write_stdout(&report.render(format))?;
    // exit_code is 0 or 1
    Ok(ExitCode::from(u8::try_from(report.exit_code(fail_on)).unwrap_or(1)))
}

fn cmd_graph(scan: &ScanArgs, format: GraphFormat) -> Result<ExitCode> {
    let schema = load_schema(scan)?;
    let inputs = discover(&scan.root, &schema)?;
    let analysis = analyze(&inputs, &schema, &scan.options());

    let mut output = match format {
        GraphFormat::Dot => analysis.graph.format_dot(),
        GraphFormat::Mermaid => analysis.graph.format_mermaid(),
        GraphFormat::Json => analysis.graph.format_json(),
    };
    if !output.ends_with('\n') {
        output.push('\n');
    }
    write_stdout(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Load and compile the schema, applying `--ext` on top of it.
fn load_schema(scan: &ScanArgs) -> Result<Schema> {
    let mut config = match &scan.schema {
        Some(path) => docset_vault::load_schema(path)
            .with_context(|| format!("failed to load schema {}", path.display()))?,
        None => SchemaConfig::default(),
    };
    if !scan.ext.is_empty() {
        config.extensions = scan.ext.clone();
    }
    config.compile().context("invalid schema")
}

fn discover(root: &Path, schema: &Schema) -> Result<Vec<SourceFile>> {
    docset_vault::discover(root, schema.extensions())
        .with_context(|| format!("failed to read documents under {}", root.display()))
}

fn write_stdout(text: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
