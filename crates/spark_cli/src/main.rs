//! Spark CLI: the command-line interface for the Spark antenna checker.
//!
//! Provides `spark check` for design-wide antenna checking, `spark violations`
//! for the remediation view of one net, and `spark max-length` for querying
//! how much wire a net may still route on a layer.

#![warn(missing_docs)]

mod check;
mod max_length;
mod pipeline;
mod violations;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Spark: antenna-effect checking for routed designs.
#[derive(Parser, Debug)]
#[command(name = "spark", version, about = "Spark Antenna Checker")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `spark.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to a JSON design snapshot, overriding `project.design`.
    #[arg(long, global = true)]
    pub design: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check antenna rules on one net or the whole design.
    Check(CheckArgs),
    /// Print the antenna violations of one net.
    Violations(ViolationsArgs),
    /// Query the maximum additional wire length per net and layer.
    MaxLength(MaxLengthArgs),
}

/// Arguments for the `spark check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Check only this net.
    #[arg(short, long)]
    pub net: Option<String>,

    /// Output format (defaults to `report.format` from `spark.toml`).
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Arguments for the `spark violations` subcommand.
#[derive(Parser, Debug)]
pub struct ViolationsArgs {
    /// The net to inspect.
    #[arg(short, long)]
    pub net: String,

    /// Diode master to validate (defaults to `check.diode_cell`).
    #[arg(long)]
    pub diode_cell: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `spark max-length` subcommand.
#[derive(Parser, Debug)]
pub struct MaxLengthArgs {
    /// Net to query. Without `--net` and `--layer` the full table is printed.
    #[arg(short, long, requires = "layer")]
    pub net: Option<String>,

    /// Routing layer to query.
    #[arg(short, long, requires = "net")]
    pub layer: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

impl From<spark_config::ReportFormat> for ReportFormat {
    fn from(format: spark_config::ReportFormat) -> Self {
        match format {
            spark_config::ReportFormat::Text => ReportFormat::Text,
            spark_config::ReportFormat::Json => ReportFormat::Json,
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
    /// Optional path to a design snapshot.
    pub design: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
        design: cli.design,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Violations(ref args) => violations::run(args, &global),
        Command::MaxLength(ref args) => max_length::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the `tracing` subscriber: `warn` by default, `debug` with
/// `--verbose`, `RUST_LOG` when set.
fn init_tracing(global: &GlobalArgs) {
    let default = if global.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .try_init();
}
