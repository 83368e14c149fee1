// src/cli/mod.rs — CLI definition (clap derive)

pub mod list;
pub mod progress;
pub mod report;
pub mod run;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "koibench",
    about = "Benchmark LLMs on code generation with compiler feedback",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the benchmark and print a report
    Run(RunArgs),
    /// List the problems in the registry
    Problems {
        /// Load problems from this directory instead of the built-in set
        #[arg(long)]
        problems_dir: Option<String>,
    },
    /// List the configured council judges
    Judges,
}

/// Flags for `koibench run`. Each one overrides the config value.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Models to benchmark (comma-separated gateway ids)
    #[arg(short, long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Problem ids to run (comma-separated; default all)
    #[arg(short, long, value_delimiter = ',')]
    pub problems: Option<Vec<String>>,

    /// Load problems from this directory instead of the built-in set
    #[arg(long)]
    pub problems_dir: Option<String>,

    /// Independent repeats per problem
    #[arg(long)]
    pub runs: Option<u32>,

    /// Dispatches per run (at least 1)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Models evaluated concurrently
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Ask the judge council to review passing solutions
    #[arg(long)]
    pub council: bool,

    /// Also write the report as JSON to this path
    #[arg(long)]
    pub json: Option<String>,

    /// Directory for per-model workspaces
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Suppress progress output (only emit the final report)
    #[arg(long)]
    pub quiet: bool,
}
