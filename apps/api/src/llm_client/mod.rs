/// LLM client: the single entry point for every Anthropic API call in Foreman.
///
/// ARCHITECTURAL RULE: no other module talks to the Anthropic API directly.
/// Extraction, checklist generation, and reporting all go through here.
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// The one model used for all calls. Hardcoded so behavior does not drift
/// between deployments.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
/// Matches the sampling temperature the intake assistant was tuned with.
const TEMPERATURE: f32 = 0.7;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response was not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("model returned no text content")]
    EmptyReply,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmReply {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl LlmReply {
    /// Text of the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
        }
    }

    /// One prompt in, one reply out. Retries 429 and 5xx responses with
    /// exponential backoff before giving up.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmReply, LlmError> {
        let body = ChatRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * (1 << attempt));
                warn!(attempt, "retrying LLM call after {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let sent = self
                .http
                .post(API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await;

            let response = match sent {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!(%status, "LLM API rejected the call: {text}");
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: text,
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let reply: LlmReply = response.json().await?;
            debug!(
                input_tokens = reply.usage.input_tokens,
                output_tokens = reply.usage.output_tokens,
                "LLM call succeeded"
            );
            return Ok(reply);
        }

        Err(last_error.unwrap_or(LlmError::ExhaustedRetries {
            attempts: MAX_ATTEMPTS,
        }))
    }

    /// Calls the model and deserializes the reply text as JSON. The prompt
    /// must instruct the model to answer with JSON only; stray markdown
    /// fences are tolerated and stripped.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let reply = self.call(prompt, system).await?;
        let text = reply.text().ok_or(LlmError::EmptyReply)?;
        serde_json::from_str(strip_code_fences(text)).map_err(LlmError::Parse)
    }
}

/// Removes a surrounding ```json ... ``` (or bare ```) fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_unwrapped() {
        let reply = "```json\n{\"job_id\": \"JOB-17\"}\n```";
        assert_eq!(strip_code_fences(reply), "{\"job_id\": \"JOB-17\"}");
    }

    #[test]
    fn bare_fence_is_unwrapped() {
        let reply = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(reply), "[1, 2]");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_still_yields_body() {
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }
}
