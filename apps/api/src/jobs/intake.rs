//! Email intake: turns a free-text repair email into a `JobRecord` via one
//! LLM extraction call.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::models::{JobRecord, JobStatus, DEFAULT_DUE_DAYS};
use crate::jobs::prompts::EMAIL_PARSE_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;

/// Raw extraction result as the model returns it. Loose on purpose: the
/// model may omit the job id and may send trades as an array or a string.
#[derive(Debug, Deserialize)]
struct ExtractedJob {
    #[serde(default)]
    job_id: Option<String>,
    scope: String,
    #[serde(deserialize_with = "string_or_list")]
    trades: String,
    #[serde(default)]
    status: Option<String>,
}

/// Extracts a job from email subject + details and stamps it with creation
/// and due dates.
pub async fn parse_email(
    subject: &str,
    details: &str,
    llm: &LlmClient,
) -> Result<JobRecord, AppError> {
    let prompt = EMAIL_PARSE_TEMPLATE
        .replace("{subject}", subject)
        .replace("{details}", details);
    let extracted: ExtractedJob = llm
        .call_json(&prompt, JSON_ONLY_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("email extraction failed: {e}")))?;

    Ok(build_record(extracted, Utc::now().date_naive()))
}

fn build_record(extracted: ExtractedJob, today: NaiveDate) -> JobRecord {
    let job_id = extracted
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_job_id);

    let status = extracted
        .status
        .as_deref()
        .and_then(JobStatus::parse)
        .unwrap_or_default();

    JobRecord {
        job_id,
        scope: extracted.scope.trim().to_string(),
        trades: extracted.trades.trim().to_string(),
        due_date: today + Duration::days(DEFAULT_DUE_DAYS),
        status,
        created_date: today,
    }
}

/// Ids minted when the email subject carries none: `JOB-` + 8 hex chars.
fn generate_job_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("JOB-{}", uuid[..8].to_uppercase())
}

/// Accepts `"Plumber, Electrician"` or `["Plumber", "Electrician"]` and
/// yields the comma-joined form either way.
fn string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Trades {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Trades::deserialize(deserializer)? {
        Trades::One(s) => s,
        Trades::Many(list) => list.join(", "),
    })
}
