//! Weekly status report over the current job table.

use crate::errors::AppError;
use crate::jobs::models::JobTable;
use crate::jobs::prompts::{REPORT_SYSTEM, REPORT_TEMPLATE};
use crate::llm_client::LlmClient;

/// Answer for an empty table. Returned without touching the model.
pub const EMPTY_REPORT: &str = "No jobs to report.";

/// Summarizes the whole table into a weekly business report. The model sees
/// the flattened report view; it does the aggregation.
pub async fn generate_status_report(table: &JobTable, llm: &LlmClient) -> Result<String, AppError> {
    if table.is_empty() {
        return Ok(EMPTY_REPORT.to_string());
    }

    let prompt = REPORT_TEMPLATE.replace("{jobs_data}", &table.to_report_view());
    let reply = llm
        .call(&prompt, REPORT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("status report generation failed: {e}")))?;
    reply
        .text()
        .map(str::to_string)
        .ok_or_else(|| AppError::Llm("status report reply had no text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::{JobRecord, JobStatus};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn empty_table_short_circuits_without_an_llm_call() {
        // A client with a bogus key never gets exercised on the empty path.
        let llm = LlmClient::new("unused".to_string());
        let report = generate_status_report(&JobTable::new(), &llm).await.unwrap();
        assert_eq!(report, EMPTY_REPORT);
    }

    #[test]
    fn report_prompt_embeds_the_table_view() {
        let mut table = JobTable::new();
        table.append(JobRecord {
            job_id: "J-1".to_string(),
            scope: "Replace window".to_string(),
            trades: "Glazier".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 5, 9).unwrap(),
            status: JobStatus::InProgress,
            created_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        });
        let prompt = REPORT_TEMPLATE.replace("{jobs_data}", &table.to_report_view());
        assert!(prompt.contains("J-1"));
        assert!(prompt.contains("Jobs by status"));
    }
}
