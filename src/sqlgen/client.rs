//! Drafting model client
//!
//! Calls the Anthropic Messages API to turn a drafting prompt into SQL
//! statements. One attempt per table; the engine performs no retries.

use crate::error::EngineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates SQL statements for \
PostgreSQL database schema migration based on provided context and instructions.";

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```sql\s*").expect("valid regex"));
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*$").expect("valid regex"));

/// Claude-backed SQL drafter
pub struct ClaudeDrafter {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeDrafter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Draft SQL from one prompt. Network, status, and shape problems all
    /// surface as `EngineError::Drafting`.
    pub async fn draft(&self, prompt: &str) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [
                {
                    "role": "user",
                    "content": prompt,
                }
            ],
        });

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(|e| EngineError::Drafting(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Drafting(format!(
                "API returned status {}",
                status
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Drafting(e.to_string()))?;

        let text = json["content"]
            .as_array()
            .and_then(|content| content.first())
            .and_then(|item| item["text"].as_str())
            .ok_or_else(|| EngineError::Drafting("Unexpected API response format".to_string()))?;

        Ok(extract_sql(text))
    }
}

/// Strip markdown code fences from a drafted response
pub fn extract_sql(response: &str) -> String {
    let opened = FENCE_OPEN.replace_all(response, "");
    let closed = FENCE_CLOSE.replace(&opened, "");
    closed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sql_strips_fences() {
        let response = "```sql\nALTER TABLE users ADD COLUMN email TEXT;\n```";
        assert_eq!(
            extract_sql(response),
            "ALTER TABLE users ADD COLUMN email TEXT;"
        );
    }

    #[test]
    fn test_extract_sql_passthrough() {
        let response = "-- No changes needed";
        assert_eq!(extract_sql(response), "-- No changes needed");
    }

    #[test]
    fn test_extract_sql_case_insensitive_fence() {
        let response = "```SQL\nDROP TABLE logs;\n```";
        assert_eq!(extract_sql(response), "DROP TABLE logs;");
    }
}
