//! Transport layer for the spreadsheet resource.
//!
//! `SheetsApi` is the seam between the sync logic and the wire: production
//! uses `HttpSheetsApi` (Google Sheets v4 + Drive v3 REST), tests use an
//! in-memory double. The trait surface is exactly what the sync needs:
//! liveness check, clear, write, read, last-modified.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::sheets::auth::TokenProvider;
use crate::sheets::{ConnectionError, SyncError};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/files";

/// Everything the sync component needs from the remote resource.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Opens the resource, resolves its primary sheet, and performs a
    /// minimal read. Called once at construction.
    async fn verify_access(&self) -> Result<(), ConnectionError>;

    /// Wipes all values on the primary sheet.
    async fn clear(&self) -> Result<(), SyncError>;

    /// Writes rows starting at the given top-left cell.
    async fn write_from(&self, start: &str, rows: &[Vec<String>]) -> Result<(), SyncError>;

    /// Reads every populated row of the primary sheet.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SyncError>;

    /// The resource's last-modified timestamp, fed to the staleness check.
    async fn last_modified_time(&self) -> Result<DateTime<Utc>, SyncError>;
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: SpreadsheetProperties,
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileMeta {
    #[serde(rename = "modifiedTime")]
    modified_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// REST client for one spreadsheet, authorized through a service account.
pub struct HttpSheetsApi {
    http: reqwest::Client,
    tokens: TokenProvider,
    spreadsheet_id: String,
    /// Title of the primary (first) sheet, resolved by `verify_access`.
    sheet_title: OnceLock<String>,
}

impl HttpSheetsApi {
    pub fn new(http: reqwest::Client, tokens: TokenProvider, spreadsheet_id: String) -> Self {
        Self {
            http,
            tokens,
            spreadsheet_id,
            sheet_title: OnceLock::new(),
        }
    }

    /// Quoted title of the primary sheet. Errors if `verify_access` has not
    /// resolved it yet.
    fn sheet_ref(&self) -> Result<String, SyncError> {
        let title = self.sheet_title.get().ok_or_else(|| {
            SyncError::Auth("spreadsheet connection was never verified".to_string())
        })?;
        Ok(format!("'{title}'"))
    }

    /// A1-notation range scoped to the primary sheet.
    fn range(&self, cells: &str) -> Result<String, SyncError> {
        Ok(format!("{}!{cells}", self.sheet_ref()?))
    }

    async fn bearer(&self) -> Result<String, SyncError> {
        self.tokens.access_token().await
    }

    /// Maps a non-success response to the construction-time taxonomy.
    async fn connection_failure(response: reqwest::Response, doing: &str) -> ConnectionError {
        let status = response.status();
        let message = error_message(&response.text().await.unwrap_or_default());
        let detail = format!("{doing}: {message}");
        if status == StatusCode::FORBIDDEN {
            ConnectionError::PermissionDenied(detail)
        } else if status.is_server_error() {
            ConnectionError::Transient(detail)
        } else {
            ConnectionError::Unknown(format!("status {status} while {detail}"))
        }
    }

    async fn sync_failure(response: reqwest::Response) -> SyncError {
        let status = response.status().as_u16();
        let message = error_message(&response.text().await.unwrap_or_default());
        SyncError::Api { status, message }
    }
}

#[async_trait]
impl SheetsApi for HttpSheetsApi {
    async fn verify_access(&self) -> Result<(), ConnectionError> {
        let token = self
            .bearer()
            .await
            .map_err(|e| ConnectionError::Unknown(e.to_string()))?;

        // Open the spreadsheet and resolve its primary sheet.
        let response = self
            .http
            .get(format!("{SHEETS_BASE}/{}", self.spreadsheet_id))
            .query(&[("fields", "properties.title,sheets.properties.title")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ConnectionError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::connection_failure(response, "opening spreadsheet").await);
        }

        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| ConnectionError::Unknown(format!("malformed metadata: {e}")))?;
        let sheet = meta
            .sheets
            .first()
            .map(|s| s.properties.title.clone())
            .ok_or_else(|| ConnectionError::Unknown("spreadsheet has no sheets".to_string()))?;
        info!(
            spreadsheet = %meta.properties.title,
            sheet = %sheet,
            "opened spreadsheet"
        );
        let _ = self.sheet_title.set(sheet);

        // Minimal read to prove the values surface is reachable too.
        let range = self
            .range("A1")
            .map_err(|e| ConnectionError::Unknown(e.to_string()))?;
        let response = self
            .http
            .get(format!("{SHEETS_BASE}/{}/values/{range}", self.spreadsheet_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ConnectionError::Transient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::connection_failure(response, "reading cell A1").await);
        }

        Ok(())
    }

    async fn clear(&self) -> Result<(), SyncError> {
        let token = self.bearer().await?;
        // A bare sheet reference covers every cell on the sheet.
        let sheet = self.sheet_ref()?;
        let response = self
            .http
            .post(format!(
                "{SHEETS_BASE}/{}/values/{sheet}:clear",
                self.spreadsheet_id
            ))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::sync_failure(response).await);
        }
        Ok(())
    }

    async fn write_from(&self, start: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        let token = self.bearer().await?;
        let range = self.range(start)?;
        let response = self
            .http
            .put(format!(
                "{SHEETS_BASE}/{}/values/{range}",
                self.spreadsheet_id
            ))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::sync_failure(response).await);
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, SyncError> {
        let token = self.bearer().await?;
        let sheet = self.sheet_ref()?;
        let response = self
            .http
            .get(format!(
                "{SHEETS_BASE}/{}/values/{sheet}",
                self.spreadsheet_id
            ))
            .bearer_auth(&token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::sync_failure(response).await);
        }
        let values: ValueRange = response
            .json()
            .await
            .map_err(|e| SyncError::Api {
                status: 200,
                message: format!("malformed value range: {e}"),
            })?;
        Ok(values.values)
    }

    async fn last_modified_time(&self) -> Result<DateTime<Utc>, SyncError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(format!("{DRIVE_BASE}/{}", self.spreadsheet_id))
            .query(&[("fields", "modifiedTime"), ("supportsAllDrives", "true")])
            .bearer_auth(&token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::sync_failure(response).await);
        }
        let meta: DriveFileMeta = response.json().await.map_err(|e| SyncError::Api {
            status: 200,
            message: format!("malformed file metadata: {e}"),
        })?;
        Ok(meta.modified_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_is_unwrapped() {
        let body = r#"{"error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "The caller does not have permission");
    }

    #[test]
    fn plain_error_body_passes_through() {
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }
}
