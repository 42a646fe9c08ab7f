//! Core analysis building blocks for Kansa
//!
//! Parsing (via SWC), diagnostics, the rule abstraction consumed by the
//! project orchestrator, and typed rule configuration.

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod parser;
pub mod rules;
