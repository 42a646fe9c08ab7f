//! CLI command implementations

pub mod analyze;
pub mod rules;

pub use analyze::AnalyzeArgs;
pub use rules::RulesArgs;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a JavaScript/TypeScript project
    Analyze(AnalyzeArgs),

    /// List the registered rules
    Rules(RulesArgs),
}
