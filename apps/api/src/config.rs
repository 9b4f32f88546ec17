use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// The LLM key is required; the spreadsheet settings are optional because
/// the service can run with a local-only table when sync is not set up.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Resource identifier of the mirrored spreadsheet.
    pub sheets_spreadsheet_id: Option<String>,
    /// Path to the service-account credential bundle.
    pub sheets_creds_file: Option<String>,
    /// Timeout for spreadsheet API calls, in seconds.
    pub sheets_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            sheets_spreadsheet_id: optional_env("GOOGLE_SHEETS_SPREADSHEET_ID"),
            sheets_creds_file: optional_env("GOOGLE_SHEETS_CREDS_FILE"),
            sheets_timeout_secs: std::env::var("SHEETS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("SHEETS_TIMEOUT_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
