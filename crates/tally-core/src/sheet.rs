//! Timesheet loading and discovery.
//!
//! A timesheet is a CSV file with a header row naming at least the `Start`,
//! `End` and `Category` columns. Columns are located once per file by header
//! name, so a missing column is reported at load time instead of on each row.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

/// Header name of the interval start column.
pub const START_COLUMN: &str = "Start";
/// Header name of the interval end column.
pub const END_COLUMN: &str = "End";
/// Header name of the category column.
pub const CATEGORY_COLUMN: &str = "Category";

/// Errors from reading a file as a timesheet.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file or directory could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The contents are not readable as CSV.
    #[error("{source_label} is not readable as tabular data")]
    Csv {
        source_label: String,
        #[source]
        source: csv::Error,
    },
    /// The file has no header row.
    #[error("{source_label} has no header row")]
    MissingHeader { source_label: String },
    /// A required column is absent from the header row.
    #[error("{source_label} is missing required column \"{column}\"")]
    MissingColumn {
        source_label: String,
        column: &'static str,
    },
}

/// One data row with its raw cell values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// Zero-based index among data rows (the header is not counted).
    pub row_index: usize,
    pub start: String,
    pub end: String,
    pub category: String,
}

impl SheetRow {
    pub fn new(row_index: usize, start: &str, end: &str, category: &str) -> Self {
        Self {
            row_index,
            start: start.to_string(),
            end: end.to_string(),
            category: category.to_string(),
        }
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    start: usize,
    end: usize,
    category: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, source_label: &str) -> Result<Self, FormatError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| FormatError::MissingColumn {
                    source_label: source_label.to_string(),
                    column,
                })
        };

        Ok(Self {
            start: find(START_COLUMN)?,
            end: find(END_COLUMN)?,
            category: find(CATEGORY_COLUMN)?,
        })
    }

    fn row(&self, row_index: usize, record: &csv::StringRecord) -> SheetRow {
        let cell = |idx: usize| record.get(idx).unwrap_or_default();
        SheetRow::new(
            row_index,
            cell(self.start),
            cell(self.end),
            cell(self.category),
        )
    }
}

/// Read timesheet rows from any CSV source.
///
/// `source_label` names the input in error messages.
pub fn read_sheet<R: io::Read>(
    reader: R,
    source_label: &str,
) -> Result<Vec<SheetRow>, FormatError> {
    let csv_err = |source| FormatError::Csv {
        source_label: source_label.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_err)?.clone();
    if headers.is_empty() {
        return Err(FormatError::MissingHeader {
            source_label: source_label.to_string(),
        });
    }
    let columns = ColumnIndex::from_headers(&headers, source_label)?;

    let mut rows = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        rows.push(columns.row(row_index, &record));
    }

    tracing::trace!(source = source_label, rows = rows.len(), "loaded timesheet");
    Ok(rows)
}

/// Load timesheet rows from a file.
pub fn load_sheet(path: &Path) -> Result<Vec<SheetRow>, FormatError> {
    let file = File::open(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_sheet(file, &path.display().to_string())
}

/// A discovered timesheet file and the label derived from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetFile {
    pub path: PathBuf,
    /// Output name for the sheet, usually its date (e.g. `2024-01-05`).
    pub label: String,
}

impl SheetFile {
    pub fn new(path: PathBuf, suffix: &str) -> Self {
        let label = date_label(&path, suffix);
        Self { path, label }
    }

    /// The sheet's day, when its label is an ISO date.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.label, "%Y-%m-%d").ok()
    }
}

/// Derive the output label from a timesheet file name.
///
/// Keeps the part after the last `-`, strips `suffix`, and turns underscores
/// into hyphens: `timesheet-2024_01_05.csv` becomes `2024-01-05`. A name
/// with nothing after its last `-` falls back to the whole stem, and a stem
/// of only hyphens to the file name.
pub fn date_label(path: &Path, suffix: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tail = name.rsplit('-').next().unwrap_or(&name);
    let mut label = tail.strip_suffix(suffix).unwrap_or(tail).trim();
    if label.is_empty() {
        label = name.strip_suffix(suffix).unwrap_or(&name).trim().trim_matches('-');
    }
    if label.is_empty() {
        label = name.as_str();
    }
    label.replace('_', "-")
}

/// List the timesheet files in `dir` whose names end with `suffix`.
///
/// Results are sorted by file name. A missing directory yields no files.
pub fn scan_sheets(dir: &Path, suffix: &str) -> Result<Vec<SheetFile>, FormatError> {
    if !dir.exists() {
        tracing::warn!(dir = ?dir, "timesheet directory does not exist");
        return Ok(Vec::new());
    }

    let io_err = |source| FormatError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let matches = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with(suffix));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    // fs::read_dir order is platform-dependent
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| SheetFile::new(path, suffix))
        .collect())
}
