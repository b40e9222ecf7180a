//! Permissive timestamp parsing for timesheet cells.
//!
//! Timesheets are written by hand, so a cell may hold a full RFC 3339
//! timestamp, a calendar date (numeric or with a month name) with a clock
//! time, or just a clock time such as `9:30` or `2pm`. Clock-only values are
//! anchored to a reference date, normally the day the sheet describes.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

/// Clock time with optional (fractional) seconds and an optional AM/PM marker.
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?(?::(?P<second>\d{2})(?:\.(?P<frac>\d{1,9}))?)?\s*(?P<meridiem>[ap]\.?\s*m\.?)?$",
    )
    .unwrap()
});

/// Calendar date followed by a clock time, separated by `T` or whitespace.
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<date>\d{1,4}[-/]\d{1,2}[-/]\d{1,4})(?:(?:T|\s+)(?P<time>.+))?$").unwrap()
});

/// Date written with a month name, `Jan 5 2024`, `January 5, 2024` or
/// `5 Jan 2024`, optionally followed by a clock time.
static MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<date>[A-Za-z]+\.?\s+\d{1,2},?\s+\d{4}|\d{1,2}\s+[A-Za-z]+\.?,?\s+\d{4})(?:,?\s+(?P<time>.+))?$",
    )
    .unwrap()
});

/// Layouts for month-name dates once punctuation is stripped. `%B` also
/// accepts the three-letter abbreviation when parsing.
const MONTH_NAME_FORMATS: &[&str] = &["%B %d %Y", "%d %B %Y"];

/// Layouts for dates that lead with a four-digit year.
const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// US-style layouts. Two-digit years come first so `1/5/24` is read as 2024
/// rather than the year 24.
const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y"];

/// Failure to interpret a timestamp cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,
    #[error("unrecognized timestamp format: {raw}")]
    Unrecognized { raw: String },
    #[error("timestamp component out of range: {raw}")]
    OutOfRange { raw: String },
}

/// Parse a timestamp cell.
///
/// Supports:
/// - RFC 3339: "2024-01-05T09:30:00Z" (the offset is discarded)
/// - Date and time: "2024-01-05 09:30", "01/05/2024 9:30 PM", "2024/01/05T21:30:15.250"
/// - Month names: "Jan 5 2024 9:30", "January 5, 2024 9:30 AM", "5 Jan 2024"
/// - Date only: "2024-01-05" (midnight)
/// - Clock time only: "9:30", "21:30:15.5", "9am", "9:30 p.m." (on `reference_date`)
pub fn parse_timestamp(
    raw: &str,
    reference_date: NaiveDate,
) -> Result<NaiveDateTime, TimestampError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }

    if let Some(caps) = DATE_TIME_RE.captures(s) {
        let date = parse_date(&caps["date"]).ok_or_else(|| out_of_range(raw))?;
        let time = match caps.name("time") {
            Some(time) => parse_clock(time.as_str(), raw)?,
            None => NaiveTime::MIN,
        };
        return Ok(date.and_time(time));
    }

    if let Some(caps) = MONTH_NAME_RE.captures(s) {
        let date = parse_month_name_date(&caps["date"]).ok_or_else(|| unrecognized(raw))?;
        let time = match caps.name("time") {
            Some(time) => parse_clock(time.as_str(), raw)?,
            None => NaiveTime::MIN,
        };
        return Ok(date.and_time(time));
    }

    let time = parse_clock(s, raw)?;
    Ok(reference_date.and_time(time))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let year_first = s.split(['-', '/']).next().is_some_and(|part| part.len() == 4);
    let formats = if year_first {
        YEAR_FIRST_FORMATS
    } else {
        MONTH_FIRST_FORMATS
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_month_name_date(s: &str) -> Option<NaiveDate> {
    let normalized = s
        .replace([',', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    MONTH_NAME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

/// Parse a clock time. `raw` is the whole cell, used for error messages.
fn parse_clock(s: &str, raw: &str) -> Result<NaiveTime, TimestampError> {
    let Some(caps) = CLOCK_RE.captures(s.trim()) else {
        return Err(unrecognized(raw));
    };

    let meridiem = caps
        .name("meridiem")
        .and_then(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_lowercase());

    // A bare number like "9" is too ambiguous to be a time.
    if caps.name("minute").is_none() && meridiem.is_none() {
        return Err(unrecognized(raw));
    }

    let component = |name: &str| -> Result<u32, TimestampError> {
        caps.name(name)
            .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| out_of_range(raw)))
    };
    let hour = component("hour")?;
    let minute = component("minute")?;
    let second = component("second")?;
    // Right-pad to nine digits so ".5" is half a second.
    let nano = match caps.name("frac") {
        Some(m) => format!("{:0<9}", m.as_str())
            .parse()
            .map_err(|_| out_of_range(raw))?,
        None => 0,
    };

    let hour = match meridiem {
        Some(marker) => {
            if !(1..=12).contains(&hour) {
                return Err(out_of_range(raw));
            }
            match (marker, hour) {
                ('a', 12) => 0,
                ('p', h) if h < 12 => h + 12,
                (_, h) => h,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nano).ok_or_else(|| out_of_range(raw))
}

fn unrecognized(raw: &str) -> TimestampError {
    TimestampError::Unrecognized {
        raw: raw.to_string(),
    }
}

fn out_of_range(raw: &str) -> TimestampError {
    TimestampError::OutOfRange {
        raw: raw.to_string(),
    }
}
