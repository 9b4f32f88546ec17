// Cross-cutting prompt fragments. Each module that calls the LLM keeps its
// own prompts.rs alongside it; only fragments shared across modules live here.

/// System prompt that enforces JSON-only output, used by every extraction
/// call whose reply is deserialized with `call_json`.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
