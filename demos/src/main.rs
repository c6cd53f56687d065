//! Cluster Demo Command-Line Interface
//!
//! Submits shell commands, scripts and Rust functions through whichever
//! backend the configuration selects.
//!
//! The binary doubles as the runner for its own function jobs: a job script
//! calls it back with `__cluster-run-function`, which is handled before the
//! normal command line is parsed.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod tasks;

use commands::{chain, clean, common::Settings, count, run, script};

/// Run jobs locally or on SLURM / Torque with one interface
#[derive(Parser)]
#[command(name = "cluster-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "CLUSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Backend override (local, slurm, torque)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a shell command as a job
    Run {
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,

        /// Job name (defaults to the program name)
        #[arg(short, long)]
        name: Option<String>,

        /// Job option as key=value (cores, time, mem, partition, dependencies, ...)
        #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Directory for scripts and output
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Wait for the job and print its output
        #[arg(short, long)]
        wait: bool,

        /// Remove generated scripts afterwards (implies --wait)
        #[arg(long)]
        clean: bool,
    },

    /// Count words in files with a function job per file
    Count {
        /// Files to count
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory for scripts and output
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Run a chain of jobs where each step depends on the previous one
    Chain {
        /// Number of steps
        #[arg(short, long, default_value = "3")]
        steps: usize,

        /// Directory for scripts and output
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Submit an existing script file
    Script {
        /// Script to submit
        path: PathBuf,

        /// Job name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Batch job ids to depend on
        #[arg(long, value_delimiter = ',')]
        depends: Vec<String>,
    },

    /// Delete every generated file in a directory
    Clean {
        /// Directory to clean
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// File name suffix (defaults to the configured one)
        #[arg(short, long)]
        suffix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = tasks::registry()?;
    if let Some(result) = registry.dispatch_from_args(std::env::args()) {
        return Ok(result?);
    }

    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match Settings::load(cli.config.as_deref(), cli.backend.as_deref()) {
        Ok(settings) => match cli.command {
            Commands::Run {
                command,
                name,
                options,
                dir,
                wait,
                clean: do_clean,
            } => {
                run::execute(
                    &settings,
                    &command,
                    name.as_deref(),
                    &options,
                    &dir,
                    wait || do_clean,
                    do_clean,
                )
                .await
            }

            Commands::Count { files, dir } => count::execute(&settings, &files, &dir).await,

            Commands::Chain { steps, dir } => chain::execute(&settings, steps, &dir).await,

            Commands::Script {
                path,
                name,
                depends,
            } => script::execute(&settings, &path, name.as_deref(), &depends).await,

            Commands::Clean { dir, suffix } => {
                clean::execute(&settings, &dir, suffix.as_deref()).await
            }
        },
        Err(e) => Err(e),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
