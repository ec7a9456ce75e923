//! Request pipeline: generate, authorize, execute, format.
//!
//! The HTTP layer only parses requests and writes envelopes; every
//! transition of the request lifecycle lives here so it can be driven
//! directly in tests.

use crate::executor::execute_query;
use crate::formatter::format_rows;
use crate::guard::authorize;
use crate::llm::LlmClient;
use crate::schema::SCHEMA_DESCRIPTOR;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, warn};

/// Stateless per-process pipeline. Constructed once at startup and shared
/// immutably across connections; nothing is cached between requests.
pub struct QueryGateway {
    llm: LlmClient,
    db_path: PathBuf,
}

impl QueryGateway {
    pub fn new(llm: LlmClient, db_path: impl Into<PathBuf>) -> Self {
        Self {
            llm,
            db_path: db_path.into(),
        }
    }

    /// Run the full pipeline for one prompt. Every outcome, success or
    /// failure, is a terminal envelope; nothing is retried.
    pub async fn handle(&self, prompt: &str) -> ResponseEnvelope {
        if prompt.trim().is_empty() {
            return ResponseEnvelope::MissingPrompt;
        }

        let generated = match self.llm.generate_sql(SCHEMA_DESCRIPTOR, prompt).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                return ResponseEnvelope::GenerationFailed;
            }
        };

        self.respond_to_generated(prompt, &generated)
    }

    /// Guard, execute and format an already-generated statement. Split out
    /// so the post-generation stages can be driven with arbitrary SQL.
    pub fn respond_to_generated(&self, prompt: &str, generated: &str) -> ResponseEnvelope {
        let authorized = match authorize(generated) {
            Ok(authorized) => authorized,
            Err(rejected) => {
                warn!(query = rejected.query.as_str(), "rejected non-SELECT statement");
                return ResponseEnvelope::Forbidden {
                    generated_query: rejected.query,
                };
            }
        };

        match execute_query(&self.db_path, &authorized) {
            Ok(result) => {
                info!(
                    rows = result.rows.len(),
                    columns = result.columns.len(),
                    "query executed"
                );
                let results = format_rows(&result.columns, &result.rows);
                ResponseEnvelope::Success {
                    original_prompt: prompt.to_string(),
                    generated_query: authorized.into_inner(),
                    columns: result.columns,
                    results,
                }
            }
            Err(failure) => {
                warn!("query execution failed: {}", failure);
                ResponseEnvelope::DbError {
                    original_prompt: prompt.to_string(),
                    generated_query: authorized.into_inner(),
                    message: failure.detail().to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    prompt: String,
}

/// Extract the `prompt` field from a JSON request body. Returns `None` for
/// malformed JSON, a missing field, or a blank prompt.
pub fn parse_prompt(body: &str) -> Option<String> {
    let request: QueryRequest = serde_json::from_str(body).ok()?;
    if request.prompt.trim().is_empty() {
        None
    } else {
        Some(request.prompt)
    }
}

/// Terminal response for one request: the status code and the exact JSON
/// body returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success {
        original_prompt: String,
        generated_query: String,
        columns: Vec<String>,
        results: Vec<Map<String, Value>>,
    },
    MissingPrompt,
    GenerationFailed,
    Forbidden {
        generated_query: String,
    },
    DbError {
        original_prompt: String,
        generated_query: String,
        message: String,
    },
}

impl ResponseEnvelope {
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            ResponseEnvelope::Success { .. } => (200, "OK"),
            ResponseEnvelope::MissingPrompt => (400, "Bad Request"),
            ResponseEnvelope::GenerationFailed => (500, "Internal Server Error"),
            ResponseEnvelope::Forbidden { .. } => (403, "Forbidden"),
            ResponseEnvelope::DbError { .. } => (500, "Internal Server Error"),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ResponseEnvelope::Success {
                original_prompt,
                generated_query,
                columns,
                results,
            } => serde_json::json!({
                "status": "success",
                "original_prompt": original_prompt,
                "generated_query": generated_query,
                "columns": columns,
                "results": results,
            }),
            ResponseEnvelope::MissingPrompt => serde_json::json!({
                "error": "prompt field is required",
            }),
            ResponseEnvelope::GenerationFailed => serde_json::json!({
                "error": "failed to generate SQL query",
            }),
            ResponseEnvelope::Forbidden { generated_query } => serde_json::json!({
                "error": "non-SELECT queries are not permitted",
                "generated_query": generated_query,
            }),
            ResponseEnvelope::DbError {
                original_prompt,
                generated_query,
                message,
            } => serde_json::json!({
                "status": "db_error",
                "original_prompt": original_prompt,
                "generated_query": generated_query,
                "message": message,
            }),
        }
    }
}
