//! Output formatters for analysis reports

pub mod json;
pub mod text;
