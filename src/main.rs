//! Live Stacks CLI
//!
//! Aggregates sampled call stacks per process and periodically prints the
//! hottest ones, as a ranked report or as folded stacks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use live_stacks::capture::ProcessFilter;
use live_stacks::commands::{display_version, execute_report, validate_dump_file, ReportArgs};
use live_stacks::utils::config::{DEFAULT_PRODUCER_THREADS, DEFAULT_TOP_STACKS};

/// Live Stacks - aggregate and report live call stacks
#[derive(Parser, Debug)]
#[command(name = "live-stacks")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a sample stream and print periodic reports
    Report {
        /// Sample stream to read ("-" for stdin)
        #[arg(long, default_value = "-")]
        input: PathBuf,

        /// Emit folded stacks in a format suitable for flame graph generation
        #[arg(short = 'f', long)]
        folded: bool,

        /// Print the top stacks, sorted by popularity (ignored for folded stacks)
        #[arg(short = 'T', long, default_value_t = DEFAULT_TOP_STACKS)]
        top: usize,

        /// Minimum number of samples a stack must have to be reported
        #[arg(short = 'm', long, default_value_t = 0)]
        min_samples: u64,

        /// Seconds between reports (0 = one report when the input ends)
        #[arg(short = 'i', long, default_value_t = 0.0)]
        interval: f64,

        /// Reports to print before quitting (0 = no limit)
        #[arg(short = 'c', long, default_value_t = 0)]
        count: usize,

        /// Clear the screen between ranked reports
        #[arg(short = 'C', long)]
        clear: bool,

        /// Include kernel frames in the stack report
        #[arg(short = 'K', long)]
        kernel: bool,

        /// Record stacks only from this process id
        #[arg(short = 'p', long, conflicts_with = "pname")]
        pid: Option<i32>,

        /// Record stacks only from processes with this name
        #[arg(short = 'P', long)]
        pname: Option<String>,

        /// JSON symbol map used to name frames
        #[arg(long, env = "LIVE_STACKS_SYMBOLS")]
        symbols: Option<PathBuf>,

        /// Producer threads feeding the aggregation table
        #[arg(long, default_value_t = DEFAULT_PRODUCER_THREADS)]
        threads: usize,

        /// Output path for the last report as JSON (optional)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output path for the last report as an SVG flame graph (optional)
        #[arg(long)]
        flamegraph: Option<PathBuf>,
    },

    /// Validate a stack dump JSON file
    Validate {
        /// Path to stack dump JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Report {
            input,
            folded,
            top,
            min_samples,
            interval,
            count,
            clear,
            kernel,
            pid,
            pname,
            symbols,
            threads,
            json,
            flamegraph,
        } => {
            let process = match (pid, pname) {
                (Some(pid), _) => ProcessFilter::Pid(pid),
                (None, Some(name)) => ProcessFilter::Name(name),
                (None, None) => ProcessFilter::All,
            };

            let args = ReportArgs {
                input,
                folded,
                top,
                min_samples,
                interval_secs: interval,
                count,
                clear,
                include_kernel: kernel,
                process,
                symbols,
                threads,
                output_json: json,
                output_svg: flamegraph,
            };

            execute_report(args)?;
        }

        Commands::Validate { file } => {
            validate_dump_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
