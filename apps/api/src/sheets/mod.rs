//! Two-way mirror between the in-memory `JobTable` and one Google
//! spreadsheet.
//!
//! The model is deliberately simple: `push` is a destructive whole-table
//! overwrite (clear, then write), `pull` is a whole-table read gated by the
//! resource's last-modified timestamp. There is no merge, no per-row
//! identity, and no automatic retry; a failed operation leaves local state
//! untouched and the caller decides when to try again. Suitable only for a
//! single-writer workflow.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::jobs::models::{JobTable, RowParseError};

pub mod auth;
pub mod client;

use auth::{ServiceAccountKey, TokenProvider};
use client::{HttpSheetsApi, SheetsApi};

/// Construction-time failures. All of these are fatal to sync; the caller
/// decides whether to run without it.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("required configuration value {0} is not set")]
    Config(&'static str),

    #[error("credentials file not found at {path}")]
    CredentialsNotFound { path: PathBuf },

    #[error("credentials file is invalid: {0}")]
    CredentialsInvalid(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Liveness-check failures, split so an operator knows whether to fix
/// sharing or just wait.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(
        "permission denied: {0}; verify the spreadsheet is shared with the \
         service account email and that the account has edit access"
    )]
    PermissionDenied(String),

    #[error("transient failure reaching the spreadsheet: {0}")]
    Transient(String),

    #[error("spreadsheet connection failed: {0}")]
    Unknown(String),
}

/// Per-operation failures from `push`/`pull`. Returned, never panicked;
/// the host application treats them as "local state unsynced".
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("spreadsheet API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("remote sheet is malformed: {0}")]
    MalformedSheet(#[from] RowParseError),
}

/// What a `pull` produced.
#[derive(Debug)]
pub enum PullOutcome {
    /// The remote changed since the last pull; here is the rebuilt table.
    Refreshed(JobTable),
    /// The remote has not been modified; no row data was fetched.
    NoChange,
}

/// Handle to one remote spreadsheet. Constructed once at startup and kept
/// for the process lifetime.
pub struct SheetsSync {
    api: Arc<dyn SheetsApi>,
    /// Remote timestamp observed by the last successful pull. `None` until
    /// the first pull, so the first pull always fetches.
    last_remote_modified: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for SheetsSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsSync")
            .field("last_remote_modified", &self.last_remote_modified)
            .finish_non_exhaustive()
    }
}

impl SheetsSync {
    /// Builds the production client from configuration and verifies the
    /// connection end to end.
    pub async fn connect(config: &Config) -> Result<Self, SetupError> {
        let spreadsheet_id = config
            .sheets_spreadsheet_id
            .clone()
            .ok_or(SetupError::Config("GOOGLE_SHEETS_SPREADSHEET_ID"))?;
        let creds_path = config
            .sheets_creds_file
            .clone()
            .ok_or(SetupError::Config("GOOGLE_SHEETS_CREDS_FILE"))?;

        let key = ServiceAccountKey::from_file(std::path::Path::new(&creds_path))?;
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.sheets_timeout_secs))
            .build()
            .map_err(|e| ConnectionError::Unknown(format!("failed to build HTTP client: {e}")))?;
        let tokens = TokenProvider::new(http.clone(), key)?;
        let api = HttpSheetsApi::new(http, tokens, spreadsheet_id);

        Self::initialize(Arc::new(api)).await
    }

    /// Verifies access through any `SheetsApi` implementation and returns a
    /// ready handle. Tests inject their double here.
    pub async fn initialize(api: Arc<dyn SheetsApi>) -> Result<Self, SetupError> {
        api.verify_access().await?;
        info!("spreadsheet connection verified");
        Ok(Self {
            api,
            last_remote_modified: None,
        })
    }

    /// Replaces the entire remote sheet with the table: header row plus one
    /// row per record, in table order. Anything present remotely but absent
    /// locally is lost. A failure between clear and write can leave the
    /// remote partially applied; that window is accepted, not guarded.
    pub async fn push(&self, table: &JobTable) -> Result<(), SyncError> {
        let rows = table.to_rows();
        self.api.clear().await?;
        self.api.write_from("A1", &rows).await?;
        debug!(records = table.len(), "pushed job table to spreadsheet");
        Ok(())
    }

    /// Fetches the remote table if it changed since the last successful
    /// pull. The staleness marker only advances on success, so a failed
    /// pull retries the same comparison.
    pub async fn pull(&mut self) -> Result<PullOutcome, SyncError> {
        let modified = self.api.last_modified_time().await?;
        if let Some(seen) = self.last_remote_modified {
            if modified <= seen {
                debug!(%modified, "remote unchanged, skipping row fetch");
                return Ok(PullOutcome::NoChange);
            }
        }

        let rows = self.api.read_all().await?;
        let table = JobTable::from_rows(&rows)?;
        self.last_remote_modified = Some(modified);
        debug!(records = table.len(), %modified, "pulled job table from spreadsheet");
        Ok(PullOutcome::Refreshed(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::{JobRecord, JobStatus, COLUMNS};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;

    /// In-memory stand-in for the remote spreadsheet.
    struct FakeSheets {
        state: Mutex<FakeState>,
    }

    struct FakeState {
        rows: Vec<Vec<String>>,
        modified: DateTime<Utc>,
        row_reads: usize,
        deny_access: bool,
        fail_row_reads: bool,
    }

    impl FakeSheets {
        fn shared() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(FakeState {
                    rows: Vec::new(),
                    modified: base_time(),
                    row_reads: 0,
                    deny_access: false,
                    fail_row_reads: false,
                }),
            })
        }

        fn rows(&self) -> Vec<Vec<String>> {
            self.state.lock().unwrap().rows.clone()
        }

        fn row_reads(&self) -> usize {
            self.state.lock().unwrap().row_reads
        }

        fn set_fail_row_reads(&self, fail: bool) {
            self.state.lock().unwrap().fail_row_reads = fail;
        }

        fn deny_access(&self) {
            self.state.lock().unwrap().deny_access = true;
        }

        /// Simulates an out-of-band remote edit.
        fn edit_remotely(&self, rows: Vec<Vec<String>>) {
            let mut state = self.state.lock().unwrap();
            state.rows = rows;
            state.modified += chrono::Duration::seconds(1);
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[async_trait]
    impl SheetsApi for FakeSheets {
        async fn verify_access(&self) -> Result<(), ConnectionError> {
            if self.state.lock().unwrap().deny_access {
                return Err(ConnectionError::PermissionDenied(
                    "The caller does not have permission".to_string(),
                ));
            }
            Ok(())
        }

        async fn clear(&self) -> Result<(), SyncError> {
            let mut state = self.state.lock().unwrap();
            state.rows.clear();
            state.modified += chrono::Duration::seconds(1);
            Ok(())
        }

        async fn write_from(&self, _start: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
            let mut state = self.state.lock().unwrap();
            state.rows = rows.to_vec();
            state.modified += chrono::Duration::seconds(1);
            Ok(())
        }

        async fn read_all(&self) -> Result<Vec<Vec<String>>, SyncError> {
            let mut state = self.state.lock().unwrap();
            state.row_reads += 1;
            if state.fail_row_reads {
                return Err(SyncError::Api {
                    status: 500,
                    message: "backend error".to_string(),
                });
            }
            Ok(state.rows.clone())
        }

        async fn last_modified_time(&self) -> Result<DateTime<Utc>, SyncError> {
            Ok(self.state.lock().unwrap().modified)
        }
    }

    fn record(job_id: &str) -> JobRecord {
        JobRecord {
            job_id: job_id.to_string(),
            scope: "Replace corroded supply line".to_string(),
            trades: "Plumber".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            status: JobStatus::WaitingForAssignment,
            created_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
        }
    }

    fn table_of(ids: &[&str]) -> JobTable {
        let mut table = JobTable::new();
        for id in ids {
            table.append(record(id));
        }
        table
    }

    #[tokio::test]
    async fn push_then_pull_round_trips_the_table() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();

        let table = table_of(&["J-1", "J-2"]);
        sync.push(&table).await.unwrap();

        match sync.pull().await.unwrap() {
            PullOutcome::Refreshed(pulled) => assert_eq!(pulled, table),
            PullOutcome::NoChange => panic!("first pull must fetch"),
        }
    }

    #[tokio::test]
    async fn pushing_twice_leaves_the_same_remote_state() {
        let fake = FakeSheets::shared();
        let sync = SheetsSync::initialize(fake.clone()).await.unwrap();

        let table = table_of(&["J-1"]);
        sync.push(&table).await.unwrap();
        let after_first = fake.rows();
        sync.push(&table).await.unwrap();
        assert_eq!(fake.rows(), after_first);
    }

    #[tokio::test]
    async fn unchanged_remote_short_circuits_the_second_pull() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();
        sync.push(&table_of(&["J-1"])).await.unwrap();

        assert!(matches!(
            sync.pull().await.unwrap(),
            PullOutcome::Refreshed(_)
        ));
        assert_eq!(fake.row_reads(), 1);

        // No remote modification in between: no data fetched.
        assert!(matches!(sync.pull().await.unwrap(), PullOutcome::NoChange));
        assert_eq!(fake.row_reads(), 1);
    }

    #[tokio::test]
    async fn remote_edit_is_picked_up_after_a_no_change_pull() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();
        sync.push(&table_of(&["J-1"])).await.unwrap();
        sync.pull().await.unwrap();

        let mut rows = vec![COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        rows.push(vec![
            "J-9".to_string(),
            "Reseal windows".to_string(),
            "Glazier".to_string(),
            "2025-02-20".to_string(),
            "In Progress".to_string(),
            "2025-02-13".to_string(),
        ]);
        fake.edit_remotely(rows);

        match sync.pull().await.unwrap() {
            PullOutcome::Refreshed(pulled) => {
                assert_eq!(pulled.len(), 1);
                assert_eq!(pulled.records()[0].job_id, "J-9");
            }
            PullOutcome::NoChange => panic!("remote edit must be fetched"),
        }
    }

    #[tokio::test]
    async fn empty_table_push_writes_exactly_the_header_row() {
        let fake = FakeSheets::shared();
        let sync = SheetsSync::initialize(fake.clone()).await.unwrap();

        sync.push(&JobTable::new()).await.unwrap();

        let rows = fake.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec![
                "Job ID",
                "Scope of Work",
                "Required Trades",
                "Due Date",
                "Status",
                "Created Date"
            ]
        );
    }

    #[tokio::test]
    async fn failed_pull_leaves_the_staleness_marker_untouched() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();
        sync.push(&table_of(&["J-1"])).await.unwrap();

        fake.set_fail_row_reads(true);
        assert!(sync.pull().await.is_err());
        fake.set_fail_row_reads(false);

        // The failed attempt must not have recorded the timestamp: the retry
        // still fetches.
        assert!(matches!(
            sync.pull().await.unwrap(),
            PullOutcome::Refreshed(_)
        ));
    }

    #[tokio::test]
    async fn malformed_remote_rows_surface_as_sync_errors() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();

        let mut rows = vec![COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        rows.push(vec![
            "J-1".to_string(),
            "Fix door".to_string(),
            "Carpenter".to_string(),
            "not a date".to_string(),
            "In Progress".to_string(),
            "2025-02-13".to_string(),
        ]);
        fake.edit_remotely(rows);

        let err = sync.pull().await.unwrap_err();
        assert!(matches!(err, SyncError::MalformedSheet(_)));
    }

    #[tokio::test]
    async fn denied_access_fails_construction_with_permission_denied() {
        let fake = FakeSheets::shared();
        fake.deny_access();

        let err = SheetsSync::initialize(fake).await.unwrap_err();
        assert!(matches!(
            err,
            SetupError::Connection(ConnectionError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn pull_normalizes_hand_edited_dates() {
        let fake = FakeSheets::shared();
        let mut sync = SheetsSync::initialize(fake.clone()).await.unwrap();

        let mut rows = vec![COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        rows.push(vec![
            "J-3".to_string(),
            "Unclog main drain".to_string(),
            "Plumber".to_string(),
            "03/01/2025".to_string(),
            "On Hold".to_string(),
            "2025-02-20".to_string(),
        ]);
        fake.edit_remotely(rows);

        match sync.pull().await.unwrap() {
            PullOutcome::Refreshed(pulled) => {
                assert_eq!(
                    pulled.records()[0].due_date,
                    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
                );
            }
            PullOutcome::NoChange => panic!("edit must be fetched"),
        }
    }
}
