//! Kansa CLI - command-line interface for the Kansa project analyzer
//!
//! Whole-project JavaScript/TypeScript analysis: file discovery, compilation
//! unit construction and per-file rule execution in one run.

mod commands;
mod output;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "kansa",
    author,
    version,
    about = "Whole-project JavaScript/TypeScript analyzer",
    long_about = "Kansa analyzes a JavaScript/TypeScript project as a whole: it discovers\n\
                  source files, groups them into compilation units from tsconfig.json\n\
                  descriptors, and runs every rule over every file in a single pass."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => args.run(),
        Commands::Rules(args) => args.run(),
    }
}
