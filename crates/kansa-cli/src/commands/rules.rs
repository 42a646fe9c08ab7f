//! Rules command - lists the registered rules and their metadata

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use kansa_core::rules::{RuleRegistry, Severity};

#[derive(Args, Debug)]
pub struct RulesArgs {}

impl RulesArgs {
    pub fn run(&self) -> Result<()> {
        let registry = RuleRegistry::with_builtin_rules();

        for rule in registry.rules() {
            let meta = rule.metadata();
            let severity = match meta.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
                Severity::Info => "info".blue().bold(),
            };
            let mut tags = Vec::new();
            if meta.main_only {
                tags.push("main-only");
            }
            if meta.requires_types {
                tags.push("requires-types");
            }
            let suffix = if tags.is_empty() {
                String::new()
            } else {
                format!(" ({})", tags.join(", "))
            };

            println!(
                "{} {} [{}]{}\n  {}",
                meta.id.bold(),
                meta.name,
                severity,
                suffix,
                meta.description
            );
        }

        Ok(())
    }
}
