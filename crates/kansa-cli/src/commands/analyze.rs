//! Analyze command - runs a whole-project analysis

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use kansa_core::config::load_config_or_default;
use kansa_core::rules::RuleRegistry;
use kansa_project::{
    AnalysisScheduler, AnalysisSettings, ProjectStores, RunStatus, SyntacticEngine,
};

use crate::output::json::JsonFormatter;
use crate::output::text::TextFormatter;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Project root to analyze
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Synthesize a whole-root compilation unit when no tsconfig.json exists
    #[arg(long)]
    pub lenient: bool,

    /// Ceiling on discovered files before type checking is skipped entirely
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// Additional glob pattern excluded from discovery (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Exit with code 1 when any finding is reported
    #[arg(long)]
    pub fail_on_findings: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl AnalyzeArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();

        if !self.path.exists() {
            anyhow::bail!("Path does not exist: {}", self.path.display());
        }

        let config_result = load_config_or_default(&self.path);
        for warning in &config_result.warnings {
            eprintln!("{} {}", "warning:".yellow().bold(), warning);
        }
        let mut rules = RuleRegistry::with_builtin_rules_and_options(&config_result.rule_options);
        let config = config_result.config;

        let mut settings = AnalysisSettings::from_config(&config.analysis);
        if self.lenient {
            settings.lenient = true;
        }
        if let Some(max_files) = self.max_files {
            settings.max_files_for_type_checking = max_files;
        }
        settings.exclusions.extend(self.exclude.iter().cloned());

        rules.configure(&config.rules);
        let engine = SyntacticEngine;

        let mut stores = ProjectStores::new();
        let mut scheduler = AnalysisScheduler::new(settings, &rules, &engine);
        let report = scheduler.run(&self.path, &mut stores)?;

        match self.format.as_str() {
            "json" => {
                let formatter = JsonFormatter::new(&self.path);
                println!("{}", formatter.format(&report)?);
            }
            "text" => {
                let formatter = TextFormatter;
                print!("{}", formatter.format(&report));
            }
            other => anyhow::bail!("Invalid format '{}'. Valid values: text, json", other),
        }

        if report.status == RunStatus::Aborted {
            process::exit(2);
        }
        if self.fail_on_findings && report.finding_count() > 0 {
            process::exit(1);
        }

        Ok(())
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn args(path: PathBuf, format: &str) -> AnalyzeArgs {
        AnalyzeArgs {
            path,
            format: format.to_string(),
            lenient: false,
            max_files: None,
            exclude: Vec::new(),
            fail_on_findings: false,
            no_color: true,
        }
    }

    #[test]
    fn analyze_rejects_missing_path() {
        let result = args(PathBuf::from("/nonexistent/project"), "text").run();
        assert!(result.is_err());
    }

    #[test]
    fn analyze_rejects_unknown_format() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "const a = 1;").unwrap();

        let result = args(dir.path().to_path_buf(), "yaml").run();
        assert!(result.is_err());
    }

    #[test]
    fn analyze_runs_on_a_small_project() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "const a = 1;").unwrap();

        args(dir.path().to_path_buf(), "json").run().unwrap();
    }
}
