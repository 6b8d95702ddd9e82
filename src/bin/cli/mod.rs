//! CLI module for Cache Lint
//!
//! Handles file discovery, check orchestration, filtering, and output

pub mod check;
pub mod discover;
pub mod filters;
pub mod output;

pub use check::{list_elements, run_check, CheckOptions, CheckReport};
pub use output::{format_listing, format_report, OutputFormat};
