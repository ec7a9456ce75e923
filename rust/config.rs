//! Process configuration loaded from the environment at startup.

use tracing::warn;

/// Placeholder key that switches the LLM client into canned-response mode.
pub const DUMMY_API_KEY: &str = "dummy-api-key";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_DATABASE: &str = "gateway.db";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub database: String,
}

impl GatewayConfig {
    /// Read configuration from the environment, falling back to defaults.
    ///
    /// A missing `OPENAI_API_KEY` does not abort startup: the client falls
    /// back to canned responses so the service stays usable offline.
    pub fn from_env() -> Self {
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!("OPENAI_API_KEY not set - falling back to canned responses");
                DUMMY_API_KEY.to_string()
            }
        };

        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("NLQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let database =
            std::env::var("NLQ_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        Self {
            api_key,
            base_url,
            model,
            database,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.api_key == DUMMY_API_KEY
    }
}
