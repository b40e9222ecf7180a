//! Summary rendering for aggregated timesheets.
//!
//! Produces the console summary, the JSON document printed with `--json`,
//! and the labelled values fed to the pie chart.

use anyhow::Result;
use chrono::Duration;
use serde::Serialize;
use tally_core::{AggregationResult, DaySummary};

// ========== Duration Formatting ==========

const UNITS: [(&str, i64); 4] = [("day", 86_400), ("hour", 3600), ("minute", 60), ("second", 1)];

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Formats a duration with every non-zero unit down to seconds.
/// "2 hours and 30 minutes", "1 day, 2 hours and 5 seconds", "0 seconds".
pub fn format_precise(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { "-" } else { "" };
    let mut remaining = duration.num_seconds().abs();

    let mut parts = Vec::new();
    for (unit, seconds) in UNITS {
        let count = remaining / seconds;
        remaining %= seconds;
        if count > 0 {
            parts.push(plural(count, unit));
        }
    }

    let text = match parts.split_last() {
        None => "0 seconds".to_string(),
        Some((only, [])) => only.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    };
    format!("{sign}{text}")
}

/// Formats a duration as its largest whole unit, for short chart labels.
/// "a moment", "45 minutes", "an hour", "3 days".
pub fn format_natural(duration: Duration) -> String {
    let seconds = duration.num_seconds().abs();
    match seconds {
        0 => "a moment".to_string(),
        1 => "a second".to_string(),
        2..60 => format!("{seconds} seconds"),
        60..120 => "a minute".to_string(),
        120..3600 => format!("{} minutes", seconds / 60),
        3600..7200 => "an hour".to_string(),
        7200..86_400 => format!("{} hours", seconds / 3600),
        86_400..172_800 => "a day".to_string(),
        _ => format!("{} days", seconds / 86_400),
    }
}

// ========== Text Report ==========

/// Lines printed for one timesheet: warnings, totals, then one line per
/// category in first-seen order.
pub fn report_lines(summary: &DaySummary) -> Vec<String> {
    let result = &summary.result;
    let mut lines: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();

    lines.push(format!("==Summary: {}==", summary.file.label));
    lines.push(format!(
        "Total tracked: {}",
        format_precise(result.category_durations.total())
    ));
    if let Some(untracked) = result.untracked_nonzero() {
        lines.push(format!("Total untracked: {}", format_precise(untracked)));
    }

    lines.push("==Chart==".to_string());
    for (category, duration) in result.category_durations.iter() {
        lines.push(format!("{category}: {}", format_precise(duration)));
    }

    lines
}

// ========== Chart Data ==========

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSlice {
    /// Category name with a short duration, e.g. "Coding (6 hours)".
    pub label: String,
    pub seconds: i64,
}

/// Pie slices in category order.
pub fn chart_slices(result: &AggregationResult) -> Vec<ChartSlice> {
    result
        .category_durations
        .iter()
        .map(|(category, duration)| ChartSlice {
            label: format!("{category} ({})", format_natural(duration)),
            seconds: duration.num_seconds(),
        })
        .collect()
}

// ========== JSON Output ==========

/// JSON summary structure.
#[derive(Debug, Serialize)]
pub struct JsonSummary {
    pub label: String,
    pub source: String,
    pub total_tracked_seconds: i64,
    pub untracked_seconds: Option<i64>,
    pub categories: Vec<JsonCategory>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonCategory {
    pub category: String,
    pub seconds: i64,
    pub label: String,
}

/// Formats one timesheet summary as pretty JSON.
pub fn format_summary_json(summary: &DaySummary) -> Result<String> {
    let result = &summary.result;
    let categories = result
        .category_durations
        .iter()
        .zip(chart_slices(result))
        .map(|((category, duration), slice)| JsonCategory {
            category: category.to_string(),
            seconds: duration.num_seconds(),
            label: slice.label,
        })
        .collect();

    let json = JsonSummary {
        label: summary.file.label.clone(),
        source: summary.file.path.display().to_string(),
        total_tracked_seconds: result.category_durations.total().num_seconds(),
        untracked_seconds: result.untracked.map(|d| d.num_seconds()),
        categories,
        warnings: result.warnings.iter().map(ToString::to_string).collect(),
    };

    Ok(serde_json::to_string_pretty(&json)?)
}
