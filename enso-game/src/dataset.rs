//! Monthly climate-index tables and filtered views over them.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::period::{YearMonth, parse_period};

/// Header names recognised as the date column, compared case-insensitively.
const DATE_HEADERS: [&str; 2] = ["날짜", "date"];

/// Errors raised when a table cannot be turned into a usable dataset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("dataset is empty")]
    Empty,
    #[error("dataset header has no columns besides the date")]
    NoIndexColumn,
    #[error("no row has a parseable date ({dropped} rows dropped)")]
    NoUsableRows { dropped: usize },
    #[error("line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub period: YearMonth,
    pub raw_date: String,
    /// Values aligned with [`Dataset::columns`]; unparsable cells are NaN.
    pub values: Vec<f64>,
}

/// A time series of one or more numeric index columns keyed by month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub date_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<Observation>,
}

impl Dataset {
    /// Parse a comma-separated table.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not well-formed CSV, has no header or
    /// index column, or has no row with a parseable date.
    pub fn from_csv_str(text: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.trim_start_matches('\u{feff}').as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(DatasetError::Empty);
        }

        let date_idx = headers
            .iter()
            .position(|h| DATE_HEADERS.iter().any(|d| h.eq_ignore_ascii_case(d)))
            .unwrap_or(0);
        let value_idx = select_value_columns(&headers, date_idx);
        if value_idx.is_empty() {
            return Err(DatasetError::NoIndexColumn);
        }

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let raw_date = record.get(date_idx).unwrap_or_default();
            let Some(period) = parse_period(raw_date) else {
                dropped += 1;
                continue;
            };
            let values = value_idx
                .iter()
                .map(|&idx| {
                    record
                        .get(idx)
                        .and_then(|cell| cell.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect();
            rows.push(Observation {
                period,
                raw_date: raw_date.to_string(),
                values,
            });
        }

        if dropped > 0 {
            log::warn!("dropped {dropped} rows with unparseable dates");
        }
        if rows.is_empty() {
            return Err(DatasetError::NoUsableRows { dropped });
        }
        rows.sort_by_key(|row| row.period);

        Ok(Self {
            date_column: headers[date_idx].clone(),
            columns: value_idx.iter().map(|&idx| headers[idx].clone()).collect(),
            rows,
        })
    }

    /// The first index column; missions default to it.
    #[must_use]
    pub fn primary_column(&self) -> &str {
        self.columns.first().map_or("", String::as_str)
    }

    /// Earliest and latest year present.
    #[must_use]
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        Some((self.rows.first()?.period.year, self.rows.last()?.period.year))
    }

    /// Apply a filter, producing the rows a mission is judged against.
    #[must_use]
    pub fn view(&self, filter: &ViewFilter) -> DataView<'_> {
        let column = filter
            .column
            .as_deref()
            .unwrap_or_else(|| self.primary_column());
        let column_idx = self.columns.iter().position(|c| c == column);
        let rows = column_idx.map_or_else(Vec::new, |idx| {
            self.rows
                .iter()
                .filter(|row| filter.admits(row.period))
                .map(|row| (row, idx))
                .collect()
        });
        DataView {
            column: column.to_string(),
            rows,
        }
    }
}

/// Every non-date column, with index-like names moved to the front so the
/// primary column is the climate index when one is present.
fn select_value_columns(headers: &[String], date_idx: usize) -> Vec<usize> {
    let (mut ordered, rest): (Vec<usize>, Vec<usize>) = (0..headers.len())
        .filter(|&idx| idx != date_idx)
        .partition(|&idx| {
            let lower = headers[idx].to_lowercase();
            lower.contains("index") || lower.contains("anomaly")
        });
    ordered.extend(rest);
    ordered
}

fn malformed(err: csv::Error) -> DatasetError {
    DatasetError::Malformed {
        line: err.position().map_or(0, csv::Position::line),
        reason: err.to_string(),
    }
}

/// Year range, month and column selection applied before a question is asked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub years: Option<(i32, i32)>,
    #[serde(default)]
    pub month: Option<u32>,
}

impl ViewFilter {
    #[must_use]
    pub fn admits(&self, period: YearMonth) -> bool {
        let in_years = self
            .years
            .is_none_or(|(from, to)| (from..=to).contains(&period.year));
        let in_month = self.month.is_none_or(|m| m == period.month);
        in_years && in_month
    }
}

/// A filtered, read-only slice of a dataset bound to one column.
#[derive(Debug, Clone)]
pub struct DataView<'a> {
    column: String,
    rows: Vec<(&'a Observation, usize)>,
}

impl DataView<'_> {
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// `(period, value)` pairs in chronological order, skipping missing values.
    pub fn points(&self) -> impl Iterator<Item = (YearMonth, f64)> + '_ {
        self.rows
            .iter()
            .map(|(row, idx)| (row.period, row.values[*idx]))
            .filter(|(_, value)| value.is_finite())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points().next().is_none()
    }

    /// The most recent `n` rows, newest first, as raw date labels.
    #[must_use]
    pub fn head(&self, n: usize) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .rev()
            .map(|(row, idx)| (row.raw_date.as_str(), row.values[*idx]))
            .filter(|(_, value)| value.is_finite())
            .take(n)
            .collect()
    }
}
