//! Gemini-backed narrator
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::NarrativeGenerator;
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiNarrator {
    client: Client,
    api_key: String,
    endpoint: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiNarrator {
    pub fn new(config: &AdvisorConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            endpoint: format!("{}/{}:generateContent", GEMINI_BASE_URL, config.gemini_model),
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, role: &str, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: role.to_string(),
                }],
            },
        }
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiNarrator {
    async fn generate(&self, role: &str, prompt: &str) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(AdvisorError::Narrative(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let request = self.build_request(role, prompt);

        info!(prompt_chars = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AdvisorError::Narrative(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(AdvisorError::Narrative(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AdvisorError::Narrative(format!("Gemini parse error: {}", e))
        })?;

        extract_text(gemini_response)
    }
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::Narrative("No response from Gemini API".to_string()))?;

    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(AdvisorError::Narrative("Empty response from Gemini".to_string()));
    }

    info!(
        finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
        chars = text.len(),
        "Gemini response received"
    );

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
    #[serde(alias = "finishReason")]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdvisorConfig {
        AdvisorConfig {
            gemini_model: "gemini-test".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            ..AdvisorConfig::default()
        }
    }

    #[test]
    fn test_request_serialization() {
        let narrator = GeminiNarrator::new(&config()).unwrap();
        assert!(narrator.endpoint.ends_with("/gemini-test:generateContent"));

        let request = narrator.build_request("You are a financial advisor", "What is my runway?");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is my runway?");
        assert_eq!(
            json["system_instruction"]["parts"][0]["text"],
            "You are a financial advisor"
        );
        assert_eq!(json["generation_config"]["max_output_tokens"], 512);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Save "}, {"text": "more."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Save more.");
    }

    #[test]
    fn test_extract_text_rejects_empty_candidates() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AdvisorError::Narrative(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let narrator = GeminiNarrator::new(&config()).unwrap();
        let err = narrator.generate("role", "prompt").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Narrative(_)));
    }
}
