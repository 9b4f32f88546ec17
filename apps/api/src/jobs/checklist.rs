//! Procedural checklist generation for a job type.

use crate::errors::AppError;
use crate::jobs::prompts::{CHECKLIST_SYSTEM, CHECKLIST_TEMPLATE};
use crate::llm_client::LlmClient;

/// Asks the model for a numbered work checklist covering assessment,
/// inspections, execution, quality checks, and client communication.
pub async fn generate_checklist(job_type: &str, llm: &LlmClient) -> Result<String, AppError> {
    let prompt = CHECKLIST_TEMPLATE.replace("{job_type}", job_type);
    let reply = llm
        .call(&prompt, CHECKLIST_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("checklist generation failed: {e}")))?;
    reply
        .text()
        .map(str::to_string)
        .ok_or_else(|| AppError::Llm("checklist reply had no text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checklist_prompt_names_the_job_type() {
        let prompt = CHECKLIST_TEMPLATE.replace("{job_type}", "water heater replacement");
        assert!(prompt.contains("water heater replacement job"));
        assert!(prompt.contains("Initial assessment"));
        assert!(prompt.contains("numbered list"));
    }
}
