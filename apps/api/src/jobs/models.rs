//! Job records and the in-memory job table, the single source of truth for
//! the session, mirrored to the spreadsheet by `sheets::SheetsSync`.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical column set and order. This is the persisted/wire shape of the
/// table: the spreadsheet header row, the JSON field names, and the report
/// view all use exactly these names in exactly this order.
pub const COLUMNS: [&str; 6] = [
    "Job ID",
    "Scope of Work",
    "Required Trades",
    "Due Date",
    "Status",
    "Created Date",
];

/// How many days after creation a job falls due when the email names no date.
pub const DEFAULT_DUE_DAYS: i64 = 7;

/// Lifecycle state of a job. Serialized everywhere (JSON and spreadsheet
/// cells) as the exact display strings below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Waiting for assignment")]
    WaitingForAssignment,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::WaitingForAssignment => "Waiting for assignment",
            JobStatus::InProgress => "In Progress",
            JobStatus::Completed => "Completed",
            JobStatus::OnHold => "On Hold",
        }
    }

    /// Parses a status cell. Whitespace and letter case are forgiven; the
    /// wording is not.
    pub fn parse(value: &str) -> Option<JobStatus> {
        let value = value.trim();
        [
            JobStatus::WaitingForAssignment,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::OnHold,
        ]
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One maintenance job. JSON field names are the spreadsheet column names so
/// API consumers see the same column-to-value mapping the sheet holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "Job ID")]
    pub job_id: String,
    #[serde(rename = "Scope of Work")]
    pub scope: String,
    /// Comma-joined trade names. Kept flat on purpose to match the flat
    /// spreadsheet model.
    #[serde(rename = "Required Trades")]
    pub trades: String,
    #[serde(rename = "Due Date")]
    pub due_date: NaiveDate,
    #[serde(rename = "Status")]
    pub status: JobStatus,
    /// Set once at creation, never changed afterwards.
    #[serde(rename = "Created Date")]
    pub created_date: NaiveDate,
}

/// Status-update target id not present in the table.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no job with id {0:?}")]
pub struct UnknownJob(pub String);

/// A remote row set that cannot be rebuilt into a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowParseError {
    #[error("header row is missing column {0:?}")]
    MissingColumn(&'static str),

    #[error("row {row}: unrecognized status {value:?}")]
    BadStatus { row: usize, value: String },

    #[error("row {row}: unparseable date {value:?} in column {column:?}")]
    BadDate {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Ordered table of job records. Insertion order is preserved; `job_id`
/// uniqueness is not enforced here; lookups take the first match in table
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobTable {
    records: Vec<JobRecord>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Appends a record. Duplicate ids are accepted; see `update_status`.
    pub fn append(&mut self, record: JobRecord) {
        self.records.push(record);
    }

    /// Overwrites the status of the first record whose id matches, leaving
    /// every other field and record untouched.
    pub fn update_status(&mut self, job_id: &str, status: JobStatus) -> Result<(), UnknownJob> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.job_id == job_id)
            .ok_or_else(|| UnknownJob(job_id.to_string()))?;
        record.status = status;
        Ok(())
    }

    /// Serializes to the wire shape: header row first, then one row per
    /// record, every value as text, dates as `%Y-%m-%d`.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.records.len() + 1);
        rows.push(COLUMNS.iter().map(|c| c.to_string()).collect());
        for r in &self.records {
            rows.push(vec![
                r.job_id.clone(),
                r.scope.clone(),
                r.trades.clone(),
                r.due_date.format("%Y-%m-%d").to_string(),
                r.status.to_string(),
                r.created_date.format("%Y-%m-%d").to_string(),
            ]);
        }
        rows
    }

    /// Rebuilds a table from remote rows. Row 1 is the header; columns are
    /// located by name, so remote column reordering is tolerated. Date cells
    /// are normalized to the canonical representation. Rows whose cells are
    /// all blank are skipped.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self, RowParseError> {
        let Some((header, data)) = rows.split_first() else {
            return Ok(Self::new());
        };

        let col = |name: &'static str| -> Result<usize, RowParseError> {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(RowParseError::MissingColumn(name))
        };
        let job_id = col(COLUMNS[0])?;
        let scope = col(COLUMNS[1])?;
        let trades = col(COLUMNS[2])?;
        let due_date = col(COLUMNS[3])?;
        let status = col(COLUMNS[4])?;
        let created_date = col(COLUMNS[5])?;

        let cell = |row: &Vec<String>, idx: usize| -> String {
            row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
        };

        let mut table = Self::new();
        for (offset, row) in data.iter().enumerate() {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            // 1-based sheet row number, counting the header.
            let row_number = offset + 2;

            let status_cell = cell(row, status);
            let status = JobStatus::parse(&status_cell).ok_or_else(|| RowParseError::BadStatus {
                row: row_number,
                value: status_cell.clone(),
            })?;

            let date = |idx: usize, column: &'static str| -> Result<NaiveDate, RowParseError> {
                let value = cell(row, idx);
                parse_flexible_date(&value).ok_or_else(|| RowParseError::BadDate {
                    row: row_number,
                    column,
                    value,
                })
            };

            table.append(JobRecord {
                job_id: cell(row, job_id),
                scope: cell(row, scope),
                trades: cell(row, trades),
                due_date: date(due_date, COLUMNS[3])?,
                status,
                created_date: date(created_date, COLUMNS[5])?,
            });
        }
        Ok(table)
    }

    /// Flat textual rendering of all columns and rows, aligned for
    /// readability. This is what the status-report prompt receives; no
    /// aggregation happens here.
    pub fn to_report_view(&self) -> String {
        let rows = self.to_rows();
        let mut widths = vec![0usize; COLUMNS.len()];
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }
        rows.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Accepts the date shapes that show up in hand-edited sheets and normalizes
/// them to a `NaiveDate`.
pub(crate) fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}
