//! Batch processing of the timesheet directory.
//!
//! Sheets are loaded and aggregated in parallel, then reported and charted
//! one at a time in file-name order. The first failing sheet stops the run;
//! sheets before it have already been printed and charted.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tally_core::{AggregateOptions, DaySummary, scan_sheets, summarize_sheets};

use crate::Config;
use crate::chart::render_pie;
use crate::report::{chart_slices, format_summary_json, report_lines};

/// Output format for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Process every timesheet, writing summaries to `out`.
///
/// Returns the number of sheets processed.
pub fn process<W: Write>(
    config: &Config,
    format: OutputFormat,
    today: NaiveDate,
    out: &mut W,
) -> Result<usize> {
    let options = AggregateOptions {
        reference_date: today,
        long_interval: config.long_interval()?,
    };

    let files = scan_sheets(&config.input_dir, &config.file_suffix)
        .context("failed to scan timesheet directory")?;
    tracing::debug!(count = files.len(), dir = ?config.input_dir, "found timesheets");

    let results = summarize_sheets(&files, today, &options);

    for (file, result) in files.iter().zip(results) {
        let summary =
            result.with_context(|| format!("failed to process {}", file.path.display()))?;
        emit(&summary, format, out)?;

        let chart_path = config.output_dir.join(format!("{}.png", summary.file.label));
        render_pie(&summary.file.label, &chart_slices(&summary.result), &chart_path)?;
    }

    Ok(files.len())
}

fn emit<W: Write>(summary: &DaySummary, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for line in report_lines(summary) {
                writeln!(out, "{line}")?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", format_summary_json(summary)?)?;
        }
    }
    Ok(())
}

/// Runs the batch against stdout, dating clock-only sheets with today's date.
pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let processed = process(config, format, Local::now().date_naive(), &mut out)?;
    if processed == 0 {
        tracing::info!(dir = ?config.input_dir, "no timesheets found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_in(root: &Path) -> Config {
        Config {
            input_dir: root.join("timesheets"),
            output_dir: root.join("charts"),
            ..Config::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn write_sheet(config: &Config, name: &str, contents: &str) {
        fs::create_dir_all(&config.input_dir).unwrap();
        fs::write(config.input_dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_process_reports_and_charts_each_sheet() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        write_sheet(
            &config,
            "sheet-2024_01_05.csv",
            "Start,End,Category\n9:00,10:00,Email\n,10:30,Coding\n",
        );
        write_sheet(
            &config,
            "sheet-2024_01_06.csv",
            "Start,End,Category\n9:00,9:30,Reading\n",
        );

        let mut out = Vec::new();
        let processed = process(&config, OutputFormat::Text, today(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(processed, 2);
        let first = text.find("==Summary: 2024-01-05==").unwrap();
        let second = text.find("==Summary: 2024-01-06==").unwrap();
        assert!(first < second);
        assert!(text.contains("Coding: 30 minutes"));
        assert!(config.output_dir.join("2024-01-05.png").is_file());
        assert!(config.output_dir.join("2024-01-06.png").is_file());
    }

    #[test]
    fn test_process_stops_at_first_failing_sheet() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        write_sheet(
            &config,
            "a-2024_01_05.csv",
            "Start,End,Category\n9:00,10:00,Email\n",
        );
        write_sheet(&config, "b-2024_01_06.csv", "Start,End,Category\n,10:00,Email\n");
        write_sheet(
            &config,
            "c-2024_01_07.csv",
            "Start,End,Category\n9:00,10:00,Email\n",
        );

        let mut out = Vec::new();
        let err = process(&config, OutputFormat::Text, today(), &mut out).unwrap_err();
        let text = String::from_utf8(out).unwrap();

        assert!(err.to_string().contains("b-2024_01_06.csv"));
        assert!(text.contains("==Summary: 2024-01-05=="));
        assert!(!text.contains("2024-01-07"));
        assert!(config.output_dir.join("2024-01-05.png").is_file());
        assert!(!config.output_dir.join("2024-01-07.png").exists());
    }

    #[test]
    fn test_process_json_output() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        write_sheet(
            &config,
            "sheet-2024_01_05.csv",
            "Start,End,Category\n9:00,10:00,Email\n",
        );

        let mut out = Vec::new();
        process(&config, OutputFormat::Json, today(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["label"], "2024-01-05");
        assert_eq!(value["total_tracked_seconds"], 3600);
    }

    #[test]
    fn test_process_rejects_oversized_long_interval() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            long_interval_minutes: i64::MAX,
            ..config_in(temp.path())
        };
        write_sheet(
            &config,
            "sheet-2024_01_05.csv",
            "Start,End,Category\n9:00,10:00,Email\n",
        );

        let mut out = Vec::new();
        let err = process(&config, OutputFormat::Text, today(), &mut out).unwrap_err();
        assert!(err.to_string().contains("long_interval_minutes"));
        assert!(out.is_empty());
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_process_empty_directory() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        let mut out = Vec::new();
        let processed = process(&config, OutputFormat::Text, today(), &mut out).unwrap();
        assert_eq!(processed, 0);
        assert!(out.is_empty());
        assert!(!config.output_dir.exists());
    }
}
