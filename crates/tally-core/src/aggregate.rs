//! Interval aggregation.
//!
//! Turns the rows of one timesheet into per-category totals, the amount of
//! untracked time between entries, and warnings for suspiciously long entries.
//!
//! # Algorithm Summary
//!
//! Rows are processed in file order, carrying the previous row's end time:
//!
//! 1. A row with a blank `Start` begins where the previous row ended. Such
//!    back-to-back rows never produce untracked time.
//! 2. A row with an explicit `Start` after an earlier row adds the gap
//!    `start - previous_end` to the untracked total.
//! 3. An end clock time before the start clock time crosses midnight, so one
//!    day is added to the interval.
//! 4. Intervals longer than the configured threshold produce a warning but
//!    still count.

use std::collections::HashMap;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::sheet::SheetRow;
use crate::timestamp::{TimestampError, parse_timestamp};

/// Which timestamp cell of a row failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Start,
    End,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "Start",
            Self::End => "End",
        };
        f.write_str(s)
    }
}

/// Errors that abort aggregation of a timesheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A `Start` or `End` cell is not a recognizable timestamp.
    #[error("error parsing \"{raw}\" in {source_label} at row {row_index} ({field}): {source}")]
    Parse {
        source_label: String,
        row_index: usize,
        field: Field,
        raw: String,
        #[source]
        source: TimestampError,
    },
    /// A row with a blank `Start` has no previous row to inherit from.
    #[error(
        "row {row_index} in {source_label} has an empty Start but no previous End to start from"
    )]
    MalformedInput {
        source_label: String,
        row_index: usize,
    },
}

/// Aggregation settings.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Date assigned to clock-only timestamps.
    pub reference_date: NaiveDate,

    /// Intervals strictly longer than this produce a warning.
    /// Default: 5 hours.
    pub long_interval: Duration,
}

impl AggregateOptions {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            long_interval: Duration::hours(5),
        }
    }
}

/// A resolved row: when it started, when it ended, and what it was spent on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub row_index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Trimmed category name.
    pub category: String,
    /// Whether `start` was taken from the previous row's end.
    pub inherited_start: bool,
    /// Length of the interval, including any midnight wraparound.
    pub duration: Duration,
}

/// An interval long enough to suggest a typo in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongIntervalWarning {
    pub source_label: String,
    pub row_index: usize,
    pub category: String,
    pub raw_start: String,
    pub raw_end: String,
    pub duration: Duration,
}

impl fmt::Display for LongIntervalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Warning: {} is a long time for {} in {} at row {}. Start: \"{}\", End: \"{}\"",
            format_clock_duration(self.duration),
            self.category,
            self.source_label,
            self.row_index,
            self.raw_start,
            self.raw_end
        )
    }
}

/// Formats a duration as `H:MM:SS`, with a leading day count when needed.
fn format_clock_duration(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { "-" } else { "" };
    let total = duration.num_seconds().abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        format!("{sign}{days} {unit}, {hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Category totals in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDurations {
    entries: Vec<(String, Duration)>,
    index: HashMap<String, usize>,
}

impl CategoryDurations {
    /// Adds `duration` to `category`, inserting it at the end if new.
    pub fn add(&mut self, category: &str, duration: Duration) {
        if let Some(&idx) = self.index.get(category) {
            self.entries[idx].1 += duration;
        } else {
            self.index.insert(category.to_string(), self.entries.len());
            self.entries.push((category.to_string(), duration));
        }
    }

    pub fn get(&self, category: &str) -> Option<Duration> {
        self.index.get(category).map(|&idx| self.entries[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.entries.iter().map(|(name, d)| (name.as_str(), *d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all category durations.
    pub fn total(&self) -> Duration {
        self.entries
            .iter()
            .fold(Duration::zero(), |acc, (_, d)| acc + *d)
    }
}

/// Result of aggregating one timesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub category_durations: CategoryDurations,

    /// Sum of gaps before explicitly started rows. `None` if no row restarted
    /// after an earlier one.
    pub untracked: Option<Duration>,

    pub warnings: Vec<LongIntervalWarning>,

    /// Every row as interpreted, in file order.
    pub intervals: Vec<Interval>,
}

impl AggregationResult {
    /// Untracked time, if any was recorded and it is non-zero.
    pub fn untracked_nonzero(&self) -> Option<Duration> {
        self.untracked.filter(|d| *d != Duration::zero())
    }
}

/// Running state of a single aggregation pass.
#[derive(Debug)]
pub struct AggregatorState<'a> {
    source_label: &'a str,
    options: &'a AggregateOptions,
    previous_end: Option<NaiveDateTime>,
    untracked: Option<Duration>,
    categories: CategoryDurations,
    warnings: Vec<LongIntervalWarning>,
    intervals: Vec<Interval>,
}

impl<'a> AggregatorState<'a> {
    pub fn new(source_label: &'a str, options: &'a AggregateOptions) -> Self {
        Self {
            source_label,
            options,
            previous_end: None,
            untracked: None,
            categories: CategoryDurations::default(),
            warnings: Vec::new(),
            intervals: Vec::new(),
        }
    }

    fn parse(&self, row: &SheetRow, field: Field) -> Result<NaiveDateTime, AggregateError> {
        let raw = match field {
            Field::Start => &row.start,
            Field::End => &row.end,
        };
        parse_timestamp(raw, self.options.reference_date).map_err(|source| {
            AggregateError::Parse {
                source_label: self.source_label.to_string(),
                row_index: row.row_index,
                field,
                raw: raw.clone(),
                source,
            }
        })
    }

    /// Folds one row into the running totals.
    pub fn push(&mut self, row: &SheetRow) -> Result<(), AggregateError> {
        let end = self.parse(row, Field::End)?;

        let inherited_start = row.start.trim().is_empty();
        let start = if inherited_start {
            self.previous_end
                .ok_or_else(|| AggregateError::MalformedInput {
                    source_label: self.source_label.to_string(),
                    row_index: row.row_index,
                })?
        } else {
            let start = self.parse(row, Field::Start)?;
            // Only an explicit restart can leave a gap; an inherited start
            // begins exactly at the previous end.
            if let Some(previous_end) = self.previous_end {
                let gap = start - previous_end;
                self.untracked = Some(self.untracked.map_or(gap, |acc| acc + gap));
            }
            start
        };

        let mut duration = end - start;
        if end < start {
            duration += Duration::days(1);
        }

        let category = row.category.trim();
        if duration > self.options.long_interval {
            let warning = LongIntervalWarning {
                source_label: self.source_label.to_string(),
                row_index: row.row_index,
                category: category.to_string(),
                raw_start: row.start.clone(),
                raw_end: row.end.clone(),
                duration,
            };
            tracing::debug!(%warning, "long interval");
            self.warnings.push(warning);
        }

        self.categories.add(category, duration);
        self.intervals.push(Interval {
            row_index: row.row_index,
            start,
            end,
            category: category.to_string(),
            inherited_start,
            duration,
        });
        self.previous_end = Some(end);
        Ok(())
    }

    pub fn finish(self) -> AggregationResult {
        AggregationResult {
            category_durations: self.categories,
            untracked: self.untracked,
            warnings: self.warnings,
            intervals: self.intervals,
        }
    }
}

/// Aggregate the rows of one timesheet.
///
/// Any unparseable timestamp or un-inheritable blank start aborts the whole
/// sheet; no partial result is returned.
pub fn aggregate(
    rows: &[SheetRow],
    source_label: &str,
    options: &AggregateOptions,
) -> Result<AggregationResult, AggregateError> {
    let mut state = AggregatorState::new(source_label, options);
    for row in rows {
        state.push(row)?;
    }
    Ok(state.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> AggregateOptions {
        AggregateOptions::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
    }

    fn rows(entries: &[(&str, &str, &str)]) -> Vec<SheetRow> {
        entries
            .iter()
            .enumerate()
            .map(|(idx, (start, end, category))| SheetRow::new(idx, start, end, category))
            .collect()
    }

    fn run(entries: &[(&str, &str, &str)]) -> AggregationResult {
        aggregate(&rows(entries), "day.csv", &options()).unwrap()
    }

    #[test]
    fn test_contiguous_explicit_rows_have_no_untracked_time() {
        let result = run(&[
            ("9:00", "10:00", "Email"),
            ("10:00", "11:30", "Coding"),
            ("11:30", "12:00", "Email"),
        ]);

        assert_eq!(result.untracked, Some(Duration::zero()));
        assert_eq!(result.untracked_nonzero(), None);
        assert_eq!(result.category_durations.get("Email"), Some(Duration::minutes(90)));
        assert_eq!(result.category_durations.get("Coding"), Some(Duration::minutes(90)));
    }

    #[test]
    fn test_single_row_has_no_untracked_time() {
        let result = run(&[("9:00", "10:00", "Email")]);
        assert_eq!(result.untracked, None);
    }

    #[test]
    fn test_inherited_start_equals_previous_end() {
        let result = run(&[("9:00", "10:15", "Email"), ("", "11:00", "Coding")]);

        let first = &result.intervals[0];
        let second = &result.intervals[1];
        assert!(second.inherited_start);
        assert_eq!(second.start, first.end);
        assert_eq!(second.duration, Duration::minutes(45));
        assert_eq!(result.untracked, None);
    }

    #[test]
    fn test_whitespace_start_is_inherited() {
        let result = run(&[("9:00", "10:00", "Email"), ("  ", "10:30", "Coding")]);
        assert!(result.intervals[1].inherited_start);
        assert_eq!(result.untracked, None);
    }

    #[test]
    fn test_explicit_restart_after_gap_is_untracked() {
        let result = run(&[("9:00", "10:00", "Email"), ("10:30", "11:00", "Coding")]);
        assert_eq!(result.untracked, Some(Duration::minutes(30)));
    }

    #[test]
    fn test_gaps_accumulate_only_for_explicit_starts() {
        let result = run(&[
            ("9:00", "10:00", "Email"),
            ("", "10:45", "Coding"),
            ("11:00", "12:00", "Coding"),
            ("", "12:30", "Lunch"),
            ("13:00", "14:00", "Meetings"),
        ]);
        // 10:45 -> 11:00 and 12:30 -> 13:00
        assert_eq!(result.untracked, Some(Duration::minutes(45)));
    }

    #[test]
    fn test_overlapping_restart_reduces_untracked() {
        let result = run(&[
            ("9:00", "10:00", "Email"),
            ("10:30", "11:00", "Coding"),
            ("10:50", "11:30", "Coding"),
        ]);
        assert_eq!(result.untracked, Some(Duration::minutes(20)));
    }

    #[test]
    fn test_midnight_wraparound() {
        let result = run(&[("23:30", "00:15", "Reading")]);
        assert_eq!(result.intervals[0].duration, Duration::minutes(45));
        assert_eq!(
            result.category_durations.get("Reading"),
            Some(Duration::minutes(45))
        );
    }

    #[test]
    fn test_wraparound_with_inherited_start() {
        let result = run(&[("22:00", "23:00", "Reading"), ("", "1:00", "Gaming")]);
        assert_eq!(result.intervals[1].duration, Duration::hours(2));
    }

    #[test]
    fn test_dated_timestamps_across_midnight_do_not_wrap() {
        let result = run(&[("2024-01-05 23:30", "2024-01-06 00:15", "Reading")]);
        assert_eq!(result.intervals[0].duration, Duration::minutes(45));
    }

    #[test]
    fn test_category_totals_sum_and_trim() {
        let result = run(&[
            ("9:00", "9:30", "Meetings"),
            ("", "10:00", "Email"),
            ("", "10:45", " Meetings "),
        ]);
        assert_eq!(
            result.category_durations.get("Meetings"),
            Some(Duration::minutes(75))
        );
        assert_eq!(result.category_durations.len(), 2);
        assert_eq!(result.category_durations.total(), Duration::minutes(105));
    }

    #[test]
    fn test_categories_keep_first_seen_order() {
        let result = run(&[
            ("9:00", "9:30", "Zeta"),
            ("", "10:00", "Alpha"),
            ("", "10:30", "Zeta"),
            ("", "11:00", "Mid"),
        ]);
        let names: Vec<_> = result.category_durations.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_six_hour_interval_warns_once() {
        let result = run(&[("8:00", "9:00", "Email"), ("9:00", "15:00", "Coding")]);

        assert_eq!(result.warnings.len(), 1);
        let warning = &result.warnings[0];
        assert_eq!(warning.row_index, 1);
        assert_eq!(warning.category, "Coding");
        assert_eq!(warning.duration, Duration::hours(6));
        assert_eq!(
            warning.to_string(),
            "Warning: 6:00:00 is a long time for Coding in day.csv at row 1. Start: \"9:00\", End: \"15:00\""
        );
        // Still counted.
        assert_eq!(result.category_durations.get("Coding"), Some(Duration::hours(6)));
    }

    #[test]
    fn test_exactly_five_hours_does_not_warn() {
        let result = run(&[("9:00", "14:00", "Coding")]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_long_interval_threshold_is_configurable() {
        let mut opts = options();
        opts.long_interval = Duration::minutes(30);
        let result = aggregate(&rows(&[("9:00", "9:45", "Email")]), "day.csv", &opts).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_first_row_without_start_is_malformed() {
        let err = aggregate(&rows(&[("", "10:00", "Email")]), "day.csv", &options()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::MalformedInput {
                source_label: "day.csv".to_string(),
                row_index: 0,
            }
        );
    }

    #[test]
    fn test_unparseable_end_reports_location() {
        let err = aggregate(
            &rows(&[("9:00", "10:00", "Email"), ("10:00", "lunch", "Food")]),
            "day.csv",
            &options(),
        )
        .unwrap_err();

        let AggregateError::Parse {
            source_label,
            row_index,
            field,
            raw,
            ..
        } = &err
        else {
            panic!("expected parse error, got {err:?}");
        };
        assert_eq!(source_label, "day.csv");
        assert_eq!(*row_index, 1);
        assert_eq!(*field, Field::End);
        assert_eq!(raw, "lunch");
        assert_eq!(
            err.to_string(),
            "error parsing \"lunch\" in day.csv at row 1 (End): unrecognized timestamp format: lunch"
        );
    }

    #[test]
    fn test_unparseable_start_is_fatal() {
        let err = aggregate(&rows(&[("nine", "10:00", "Email")]), "day.csv", &options())
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Parse {
                field: Field::Start,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_end_is_a_parse_error() {
        let err = aggregate(&rows(&[("9:00", "", "Email")]), "day.csv", &options()).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Parse {
                field: Field::End,
                source: TimestampError::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_no_rows_is_empty_result() {
        let result = run(&[]);
        assert!(result.category_durations.is_empty());
        assert_eq!(result.untracked, None);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_format_clock_duration() {
        assert_eq!(format_clock_duration(Duration::minutes(45)), "0:45:00");
        assert_eq!(format_clock_duration(Duration::hours(6)), "6:00:00");
        assert_eq!(
            format_clock_duration(Duration::hours(25) + Duration::seconds(5)),
            "1 day, 1:00:05"
        );
        assert_eq!(format_clock_duration(-Duration::minutes(5)), "-0:05:00");
    }
}
