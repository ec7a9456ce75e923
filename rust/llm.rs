//! Client for the external text-generation service.
//!
//! Targets any OpenAI-compatible `chat/completions` endpoint. Sampling is
//! pinned to temperature 0.0 so repeated prompts produce stable SQL. When
//! constructed with the placeholder API key the client answers from canned
//! responses instead of the network, which keeps the pipeline runnable and
//! testable offline.

use crate::config::DUMMY_API_KEY;
use crate::error::{GatewayError, Result};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            model,
        }
    }

    /// Translate a natural-language prompt into a single SQL statement
    /// against the described schema.
    ///
    /// Fails with `GatewayError::Llm` when the remote call errors, the
    /// service reports an error, or the cleaned completion is empty. Not
    /// retried.
    pub async fn generate_sql(&self, schema: &str, prompt: &str) -> Result<String> {
        let full_prompt = format!(
            "{}\n\nCONVERT the following request into SQL:\n'{}'",
            schema, prompt
        );

        let completion = self.call_llm(&full_prompt).await?;
        let sql = strip_code_fences(&completion);

        if sql.is_empty() {
            return Err(GatewayError::Llm(
                "Generation service returned empty text".to_string(),
            ));
        }

        debug!(generated = sql.as_str(), "generated SQL");
        Ok(sql)
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        // Canned responses keep the pipeline usable without an API key.
        if self.api_key == DUMMY_API_KEY {
            return Ok(canned_response(prompt));
        }

        let client = reqwest::Client::new();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "Return a single SQL statement only, no prose, no code fences."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0,
            "max_tokens": 500,
        });

        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            return Err(GatewayError::Llm(format!("LLM API error: {}", error)));
        }

        let content = response_json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                GatewayError::Llm(format!(
                    "No completion in LLM response: {}",
                    response_json
                ))
            })?;

        if let Some(finish_reason) = response_json["choices"][0]
            .get("finish_reason")
            .and_then(|r| r.as_str())
        {
            if finish_reason == "length" {
                warn!("LLM response was truncated due to length limit");
            }
        }

        Ok(content.to_string())
    }
}

/// Remove surrounding markdown code-fence markers and whitespace from a
/// completion.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

/// Keyword-matched canned SQL for dummy-key mode.
fn canned_response(prompt: &str) -> String {
    let lower = prompt.to_lowercase();

    if lower.contains("delete") || lower.contains("remove") || lower.contains("drop") {
        // Deliberately a mutation, so the guard path can be exercised
        // end-to-end without a live generation service.
        "DELETE FROM Produtos;".to_string()
    } else if lower.contains("customer") || lower.contains("client") {
        "SELECT * FROM Clientes;".to_string()
    } else if lower.contains("product") {
        "SELECT * FROM Produtos;".to_string()
    } else if lower.contains("sale") || lower.contains("sold") {
        "SELECT * FROM Vendas;".to_string()
    } else {
        "SELECT name FROM sqlite_master WHERE type = 'table';".to_string()
    }
}
