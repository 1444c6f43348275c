//! Text-generation backend behind a narrow `generate(prompt) -> text` contract.
//!
//! The pipeline never talks to the model API directly; everything goes through
//! [`TextGenerator`] so tests can substitute canned responses.

use crate::error::{DataRoomError, Result};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            model,
            base_url,
            client,
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": 1000
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DataRoomError::Llm(format!("LLM API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DataRoomError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DataRoomError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

/// Pull a JSON object out of raw model output.
///
/// Models wrap JSON in markdown fences or prose more often than not, so try a
/// fenced block first, then the widest brace span, then the whole text.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let fence = regex::Regex::new(r"(?s)```json\s*(.*?)\s*```").ok()?;
    if let Some(caps) = fence.captures(text) {
        if let Ok(value) = serde_json::from_str(caps.get(1)?.as_str()) {
            return Some(value);
        }
    }

    let braces = regex::Regex::new(r"(?s)\{.*\}").ok()?;
    if let Some(m) = braces.find(text) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Some(value);
        }
    }

    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text = "Here is the plan:\n```json\n{\"a\": 1}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extracts_bare_object() {
        let text = "Sure! {\"analysis\": \"ok\", \"steps\": []} hope that helps";
        let value = extract_json(text).unwrap();
        assert_eq!(value["analysis"], "ok");
    }

    #[test]
    fn rejects_prose() {
        assert!(extract_json("no json here at all").is_none());
    }
}
