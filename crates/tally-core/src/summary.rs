//! Per-file load and aggregate pipeline.

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::{AggregateError, AggregateOptions, AggregationResult, aggregate};
use crate::sheet::{FormatError, SheetFile, load_sheet};

/// Any failure that stops a timesheet from being summarized.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// The aggregated contents of one timesheet file.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub file: SheetFile,
    pub result: AggregationResult,
}

/// Load and aggregate a single timesheet.
///
/// Clock-only timestamps are anchored to the date in the file's label, or to
/// `fallback_date` when the label is not a date.
pub fn summarize_sheet(
    file: &SheetFile,
    fallback_date: NaiveDate,
    base: &AggregateOptions,
) -> Result<DaySummary, SheetError> {
    let rows = load_sheet(&file.path)?;
    let options = AggregateOptions {
        reference_date: file.reference_date().unwrap_or(fallback_date),
        ..base.clone()
    };
    let result = aggregate(&rows, &file.path.display().to_string(), &options)?;

    tracing::debug!(
        label = %file.label,
        rows = rows.len(),
        categories = result.category_durations.len(),
        warnings = result.warnings.len(),
        "summarized timesheet"
    );

    Ok(DaySummary {
        file: file.clone(),
        result,
    })
}

/// Summarize many timesheets in parallel.
///
/// Files share no state, so each is processed independently. The returned
/// vector is in the same order as `files`.
pub fn summarize_sheets(
    files: &[SheetFile],
    fallback_date: NaiveDate,
    base: &AggregateOptions,
) -> Vec<Result<DaySummary, SheetError>> {
    files
        .par_iter()
        .map(|file| summarize_sheet(file, fallback_date, base))
        .collect()
}
