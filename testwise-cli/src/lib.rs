#![warn(missing_docs)]
//! Testwise CLI Library
//!
//! Command-line front end: load a CSV, diagnose it, recommend a test, run it
//! and report. Use `testwise::run()` (or `testwise_cli::run()`) in a main
//! function to get the full CLI.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     testwise_cli::run()
//! }
//! ```

mod config;
mod data;
mod formatting;
mod pipeline;

pub use config::*;
pub use data::{load_csv, read_csv};
pub use formatting::{describe_homogeneity, format_human_output, format_p};
pub use pipeline::{PipelineConfig, analyze, diagnose_sample, normality_flag};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use testwise_logic::{SelectorContext, recommend};
use testwise_report::{NormalityBasis, OutputFormat, generate_json_report};
use testwise_stats::GroupedSample;

/// Testwise CLI arguments
#[derive(Parser, Debug)]
#[command(name = "testwise")]
#[command(author, version, about = "Testwise - diagnose your data before you test it")]
pub struct Cli {
    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnose a CSV column, recommend a test and run it
    Analyze(AnalyzeArgs),
    /// Recommend a test from known diagnostic flags
    Recommend {
        /// Data looks normal
        #[arg(long, action = clap::ArgAction::Set)]
        normal: bool,
        /// Group variances are equal (unchecked when omitted)
        #[arg(long, action = clap::ArgAction::Set)]
        homogeneous: Option<bool>,
        /// Paired design
        #[arg(long)]
        paired: bool,
        /// Repeated measures nested in subjects
        #[arg(long)]
        hierarchical: bool,
        /// Number of independent groups
        #[arg(long)]
        groups: Option<usize>,
    },
    /// Write a default testwise.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Arguments of `testwise analyze`
#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// CSV file with a header row
    #[arg(name = "CSV")]
    pub input: PathBuf,

    /// Numeric column to analyze
    #[arg(long)]
    pub value: Option<String>,

    /// Group or condition column
    #[arg(long)]
    pub group: Option<String>,

    /// Subject identifier column (marks the design hierarchical)
    #[arg(long)]
    pub id: Option<String>,

    /// Row order within the two groups defines pairs
    #[arg(long)]
    pub paired: bool,

    /// Mixed-model formula, e.g. "Value ~ C(Condition) + (1|SubjectID)"
    #[arg(long)]
    pub formula: Option<String>,

    /// Outlier rule: iqr or zscore
    #[arg(long)]
    pub outlier_method: Option<String>,

    /// IQR multiplier or z threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Normality basis for selection: groups or pooled
    #[arg(long)]
    pub basis: Option<NormalityBasis>,

    /// Significance level
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Diagnose and recommend only
    #[arg(long)]
    pub no_inference: bool,

    /// Output format: human or json
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the Testwise CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Testwise CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "testwise=debug"
    } else {
        "testwise=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(ref args) => {
            // Discover testwise.toml configuration (CLI flags override)
            let config = TestwiseConfig::discover().unwrap_or_default();
            run_analyze(args, &config)
        }
        Commands::Recommend {
            normal,
            homogeneous,
            paired,
            hierarchical,
            groups,
        } => {
            let context = SelectorContext::default()
                .with_paired(paired)
                .with_hierarchical(hierarchical)
                .with_group_count(groups);
            let recommendation = recommend(normal, homogeneous, &context);
            println!("{}", recommendation.method);
            println!("{}", recommendation.advice);
            Ok(())
        }
        Commands::Init { force } => init_config(Path::new(CONFIG_FILE), force),
    }
}

/// Build a pipeline configuration by layering: testwise.toml defaults → CLI overrides.
pub fn build_pipeline_config(
    args: &AnalyzeArgs,
    config: &TestwiseConfig,
) -> anyhow::Result<PipelineConfig> {
    let outlier_method = config
        .diagnosis
        .outlier_method(args.outlier_method.as_deref(), args.threshold)?;

    Ok(PipelineConfig {
        outlier_method,
        normality_basis: args.basis.unwrap_or(config.diagnosis.normality_basis),
        assume_homogeneous_when_inconclusive: config
            .diagnosis
            .assume_homogeneous_when_inconclusive
            .then_some(true),
        run_inference: config.inference.run && !args.no_inference,
        alpha: args.alpha.unwrap_or(config.inference.alpha),
        formula: args.formula.clone().or_else(|| config.design.formula.clone()),
    })
}

fn run_analyze(args: &AnalyzeArgs, config: &TestwiseConfig) -> anyhow::Result<()> {
    let value = args
        .value
        .as_deref()
        .or(config.design.value_column.as_deref())
        .context("--value is required (or set design.value_column in testwise.toml)")?;
    let group = args.group.as_deref().or(config.design.group_column.as_deref());
    let id = args.id.as_deref().or(config.design.id_column.as_deref());
    let paired = args.paired || config.design.paired;

    let table = load_csv(&args.input)?;
    let grouped = GroupedSample::new(&table, value, group, id)
        .context("Failed to build the analysis design")?
        .with_pairing(paired);

    let pipeline = build_pipeline_config(args, config)?;
    let mut report = analyze(&grouped, &pipeline);
    report.meta = report.meta.with_source(args.input.display().to_string());

    let format = args.format.unwrap_or(config.output.format);
    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Human => format_human_output(&report),
    };

    // Write output
    if let Some(path) = &args.output {
        let path = resolve_output_path(path, config);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    Ok(())
}

/// Relative output paths land in `output.directory` when one is configured
fn resolve_output_path(path: &Path, config: &TestwiseConfig) -> PathBuf {
    match &config.output.directory {
        Some(dir) if path.is_relative() => Path::new(dir).join(path),
        _ => path.to_path_buf(),
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(path, TestwiseConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}
