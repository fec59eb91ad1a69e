//! LaTiao CLI - run column derivation programs over dataset files.
//!
//! The CLI is a thin host around the engine: it loads a dataset, binds it as
//! a program and prints what the program exports. `serve` speaks the worker
//! protocol over stdin/stdout for hosts in other processes.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use latiao_engine::Config;

/// LaTiao column derivation tool.
#[derive(Parser)]
#[command(name = "latiao")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress info messages and results
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run programs over a dataset and print the exported columns
    Run {
        /// Dataset file (.json column array or .csv with a header row)
        data: PathBuf,

        /// Program text; repeat to run several programs in order
        #[arg(short, long = "expr", required_unless_present = "file")]
        exprs: Vec<String>,

        /// Read program text from a file, run after any --expr
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum rows to print in table output
        #[arg(long, default_value_t = 20)]
        rows: usize,

        /// Also print statistics of every exported column
        #[arg(long)]
        stats: bool,
    },

    /// Parse and type-check a program without running it
    Check {
        /// Program text
        source: String,

        /// Dataset whose fields the program refers to
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// List the operator library
    Ops {
        /// Only show overloads of this operator (with or without `$`)
        name: Option<String>,
    },

    /// Serve JSON worker requests, one per line, on stdin/stdout
    Serve,
}

fn init_logging(verbose: bool, quiet: bool, serve: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        return;
    } else {
        tracing::Level::INFO
    };
    // stdout carries results; logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if serve {
        subscriber.with_ansi(false).init();
    } else {
        subscriber.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, matches!(cli.command, Commands::Serve));

    let config = Config::from_env();
    let result = match cli.command {
        Commands::Run {
            data,
            exprs,
            file,
            rows,
            stats,
        } => commands::run::run(
            &commands::run::RunArgs {
                data: &data,
                exprs: &exprs,
                file: file.as_deref(),
                rows,
                stats,
            },
            config,
            cli.format,
            cli.quiet,
        ),
        Commands::Check { source, data } => {
            commands::check::run(&source, data.as_deref(), config, cli.format, cli.quiet)
        }
        Commands::Ops { name } => commands::ops::run(name.as_deref(), cli.format, cli.quiet),
        Commands::Serve => commands::serve::run(config),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
