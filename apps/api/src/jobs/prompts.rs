// All LLM prompt constants for the jobs module. The extraction call reuses
// the JSON-only system fragment from llm_client::prompts.

/// Email extraction prompt. Replace `{subject}` and `{details}` before
/// sending.
pub const EMAIL_PARSE_TEMPLATE: &str = r#"Extract the following information from this repair job email:
Subject: {subject}
Details: {details}

Please provide:
1. Job ID (from the subject if available, otherwise null)
2. Scope of work (brief description)
3. Required trades (list all needed)
4. Status (set as "Waiting for assignment")

Return a JSON object with this EXACT schema (no extra fields):
{
  "job_id": "R-2041",
  "scope": "Replace broken water heater in unit 4B",
  "trades": ["Plumber", "Electrician"],
  "status": "Waiting for assignment"
}

Use null for job_id when the subject carries none. "trades" may be a JSON
array or a comma-separated string."#;

/// System prompt for checklist generation. Prose output, not JSON.
pub const CHECKLIST_SYSTEM: &str = "You are an experienced trades operations manager \
    who writes clear, actionable work checklists for field crews.";

/// Checklist prompt. Replace `{job_type}` before sending.
pub const CHECKLIST_TEMPLATE: &str = r#"Create a detailed checklist for a {job_type} job. Include steps for:
1. Initial assessment
2. Required inspections
3. Work execution
4. Quality checks
5. Client communication

Format as a numbered list."#;

/// System prompt for the weekly status report.
pub const REPORT_SYSTEM: &str = "You are an operations coordinator writing a concise \
    weekly status report for a property maintenance business.";

/// Status report prompt. Replace `{jobs_data}` with the flattened table view
/// before sending.
pub const REPORT_TEMPLATE: &str = r#"Generate a weekly status report based on this jobs data:
{jobs_data}

Provide:
1. Total number of active jobs
2. Jobs by status
3. Upcoming due dates
4. Key actions needed

Format as a clear business report."#;
