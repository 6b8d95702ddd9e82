//! Cargo subcommand for Cache Lint
//!
//! Usage: cargo cache-lint check [options]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::OutputFormat;

/// Environment variable holding a tracing filter, e.g. `debug`
const LOG_ENV: &str = "CACHE_LINT_LOG";

#[derive(Parser)]
#[command(name = "cargo-cache-lint")]
#[command(about = "Check cache annotation expressions against function parameters", long_about = None)]
struct Cli {
    /// Verbose logging (overridden by CACHE_LINT_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every cache attribute under the given paths
    Check {
        /// Files or directories to check (default: current directory)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// Additional reserved identifier (besides root and result)
        #[arg(long, action = clap::ArgAction::Append)]
        reserved: Vec<String>,

        /// Skip paths containing this text
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Filter by function name (supports * at either end)
        #[arg(long)]
        name: Option<String>,

        /// Number of parallel jobs
        #[arg(short, long, default_value = "1")]
        jobs: usize,
    },

    /// List annotated functions and their expressions
    List {
        /// Files or directories to scan (default: current directory)
        paths: Vec<PathBuf>,

        /// Output format (human or json)
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// Skip paths containing this text
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,
    },

    /// Print the identifiers referenced by an expression
    Extract {
        expression: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Drop the subcommand name cargo inserts: `cargo-cache-lint cache-lint check ..`
fn cli_args() -> Vec<String> {
    let mut args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("cache-lint") {
        args.remove(1);
    }
    args
}

fn default_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
    } else {
        paths
    }
}

fn main() {
    let cli = Cli::parse_from(cli_args());
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check {
            paths,
            format,
            reserved,
            exclude,
            name,
            jobs,
        } => {
            let options = cli::CheckOptions {
                roots: default_paths(paths),
                excludes: exclude,
                reserved,
                name,
                jobs,
            };
            handle_check(&options, format)
        }
        Commands::List { paths, format, exclude } => handle_list(default_paths(paths), &exclude, format),
        Commands::Extract { expression } => handle_extract(&expression),
    };

    std::process::exit(exit_code);
}

fn handle_check(options: &cli::CheckOptions, format: OutputFormat) -> i32 {
    let report = match cli::run_check(options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error running check: {:#}", e);
            return 2;
        }
    };

    print!("{}", cli::format_report(&report, format));

    // Return exit code: 0 if clean, 1 if anything was reported
    if report.has_errors() {
        1
    } else {
        0
    }
}

fn handle_list(paths: Vec<PathBuf>, exclude: &[String], format: OutputFormat) -> i32 {
    let elements = match cli::list_elements(&paths, exclude) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error discovering annotated functions: {:#}", e);
            return 2;
        }
    };

    print!("{}", cli::format_listing(&elements, format));
    0
}

fn handle_extract(expression: &str) -> i32 {
    for identifier in cache_lint_core::extract_identifiers(expression) {
        println!("{}", identifier);
    }
    0
}
