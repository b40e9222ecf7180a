//! Core domain logic for tally.
//!
//! This crate contains the fundamental types and logic for:
//! - Timestamp parsing: permissive reading of hand-written time cells
//! - Sheet loading: CSV timesheets located by header name, file discovery
//! - Aggregation: per-category totals, untracked gaps, long-interval warnings

pub mod aggregate;
pub mod sheet;
mod summary;
pub mod timestamp;

pub use aggregate::{
    AggregateError, AggregateOptions, AggregationResult, AggregatorState, CategoryDurations,
    Field, Interval, LongIntervalWarning, aggregate,
};
pub use sheet::{FormatError, SheetFile, SheetRow, load_sheet, read_sheet, scan_sheets};
pub use summary::{DaySummary, SheetError, summarize_sheet, summarize_sheets};
pub use timestamp::{TimestampError, parse_timestamp};
