//! Timesheet summary CLI library.
//!
//! This crate provides the CLI interface, reporting, and chart output for
//! tally.

pub mod chart;
mod cli;
mod config;
mod font;
pub mod report;
pub mod run;

pub use cli::Cli;
pub use config::Config;
