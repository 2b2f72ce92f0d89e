use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covtree::adapters::Format;
use covtree::chart::ChartConfig;
use covtree::cli::{self, Input, Style};
use covtree::level::CoverageLevel;
use covtree::table::TableConfig;

/// covtree: hierarchical coverage rollup and build-to-build deltas.
#[derive(Parser)]
#[command(name = "covtree", version, about)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    /// Coverage report files of one build.
    #[arg(required = true)]
    reports: Vec<PathBuf>,

    /// Name of the root module.
    #[arg(long, default_value = "root")]
    module: String,

    /// Override format detection (cobertura, jacoco, lcov).
    #[arg(long)]
    format: Option<Format>,
}

impl ReportArgs {
    fn input(self) -> Input {
        Input {
            module: self.module,
            reports: self.reports,
            format: self.format,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show whole-build coverage per level.
    Summary {
        #[command(flatten)]
        input: ReportArgs,

        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },

    /// List per-file coverage.
    Files {
        #[command(flatten)]
        input: ReportArgs,

        /// Metrics shown as columns.
        #[arg(long, value_delimiter = ',', default_value = "line,conditional")]
        columns: Vec<CoverageLevel>,

        /// Sort ascending by this column (worst files first).
        #[arg(long)]
        sort_by: Option<CoverageLevel>,

        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },

    /// Print the treemap projection as JSON.
    Tree {
        #[command(flatten)]
        input: ReportArgs,

        /// Metric that sizes the treemap.
        #[arg(long, default_value = "line")]
        metric: CoverageLevel,

        /// Keep dotted package names instead of nesting them.
        #[arg(long)]
        flat: bool,
    },

    /// Compare a build against a reference build.
    Delta {
        #[command(flatten)]
        input: ReportArgs,

        /// Coverage report of the reference build (repeat for several).
        #[arg(long, required = true, action = ArgAction::Append)]
        reference: Vec<PathBuf>,

        /// Metric compared node by node.
        #[arg(long, default_value = "line")]
        metric: CoverageLevel,

        /// Level of the nodes listed as regressions.
        #[arg(long, default_value = "file")]
        level: CoverageLevel,

        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "covtree=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let output = match args.command {
        Commands::Summary { input, style } => cli::cmd_summary(&input.input(), style)?,
        Commands::Files {
            input,
            columns,
            sort_by,
            style,
        } => cli::cmd_files(&input.input(), &TableConfig { columns }, sort_by, style)?,
        Commands::Tree {
            input,
            metric,
            flat,
        } => {
            let config = ChartConfig {
                metric,
                ..ChartConfig::default()
            };
            cli::cmd_tree(&input.input(), &config, flat)?
        }
        Commands::Delta {
            input,
            reference,
            metric,
            level,
            style,
        } => {
            let candidate = input.input();
            let reference = Input {
                module: candidate.module.clone(),
                reports: reference,
                format: candidate.format,
            };
            cli::cmd_delta(&candidate, &reference, metric, level, style)?
        }
    };
    print!("{output}");
    Ok(())
}
