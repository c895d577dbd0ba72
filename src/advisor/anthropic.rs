//! Anthropic Claude advisor integration.
//!
//! Implements the `AdvisorClient` trait using the Anthropic Messages API.
//! Handles request construction, strict response validation, and rate
//! limiting with exponential backoff.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{build_user_prompt, parse_recommendation, system_prompt, AdvisorClient, AdvisorContext};
use crate::types::Recommendation;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: String,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnthropicAdvisor {
    http: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAdvisor {
    pub fn new(
        api_key: String,
        model: Option<String>,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
        })
    }

    /// Send a messages request with retry + backoff, returning the text.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<String> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message.to_string(),
            }],
            system: system.to_string(),
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying Anthropic API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: MessagesResponse = response
                            .json()
                            .await
                            .context("Failed to parse Anthropic response")?;

                        let text = body
                            .content
                            .iter()
                            .filter_map(|b| b.text.as_deref())
                            .collect::<Vec<_>>()
                            .join("");

                        return Ok(text);
                    }

                    // Retryable errors: 429 (rate limit), 500+, 529 (overloaded)
                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable Anthropic API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    // Non-retryable error
                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Anthropic API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Anthropic request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        Err(crate::types::BotError::Advisor {
            model: self.model.clone(),
            message: format!(
                "failed after {} retries: {}",
                MAX_RETRIES,
                last_error.unwrap_or_default()
            ),
        }
        .into())
    }
}

#[async_trait]
impl AdvisorClient for AnthropicAdvisor {
    async fn recommend(&self, ctx: &AdvisorContext<'_>) -> Result<Recommendation> {
        let prompt = build_user_prompt(ctx);
        let text = self.call_api(system_prompt(), &prompt).await?;
        let rec = parse_recommendation(&text)?;

        debug!(
            symbol = %ctx.snapshot.symbol,
            action = %rec.action,
            confidence = rec.confidence,
            "Advisor recommendation parsed"
        );

        Ok(rec)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_applied() {
        let advisor = AnthropicAdvisor::new("key".into(), None, 512, 30).unwrap();
        assert_eq!(advisor.model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_explicit_model_kept() {
        let advisor =
            AnthropicAdvisor::new("key".into(), Some("claude-haiku-3".into()), 512, 30).unwrap();
        assert_eq!(advisor.model_name(), "claude-haiku-3");
    }

    #[test]
    fn test_request_serializes() {
        let req = MessagesRequest {
            model: "m".into(),
            max_tokens: 128,
            messages: vec![Message {
                role: "user".into(),
                content: "hi".into(),
            }],
            system: "sys".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("max_tokens"));
        assert!(json.contains("\"system\":\"sys\""));
    }

    #[test]
    fn test_response_text_joined() {
        let body = r#"{"content": [{"type": "text", "text": "{\"action\""}, {"type": "text", "text": ": \"HOLD\"}"}]}"#;
        let resp: MessagesResponse = serde_json::from_str(body).unwrap();
        let text: String = resp
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect();
        assert!(text.contains("HOLD"));
    }
}
