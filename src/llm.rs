//! Minimal client for an OpenAI-compatible chat completions endpoint,
//! shared by block translation and word analysis.

use std::time::Duration;

use crate::config::Settings;
use crate::error::{Result, WortblickError};

/// Chat completion client bound to one credential and model
pub struct LlmClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// Build a client from settings; fails with `MissingCredential` when no
    /// API key is configured
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.credential()?;
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.batch_timeout_secs.max(1))))
            .build()
            .into();

        Ok(Self {
            agent,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
        })
    }

    /// Send one system + user exchange and return the assistant's text
    pub fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send_json(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) if code == 401 || code == 403 => {
                return Err(WortblickError::InvalidCredential(format!("HTTP {}", code)));
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = response.into_body().read_json()?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| WortblickError::TranslationFailed("No content in response".into()))
    }
}

/// Strip markdown code fencing from a model reply (e.g., ```json ... ```)
/// Also handles cases where there's text before the code block
pub fn strip_code_fencing(s: &str) -> String {
    let trimmed = s.trim();

    if let Some(json_start) = trimmed.find("```json") {
        let after_fence = &trimmed[json_start + 7..];
        if let Some(end_fence) = after_fence.find("```") {
            return after_fence[..end_fence].trim().to_string();
        }
        return after_fence.trim().to_string();
    }

    if let Some(code_start) = trimmed.find("```\n") {
        let after_fence = &trimmed[code_start + 4..];
        if let Some(end_fence) = after_fence.find("```") {
            return after_fence[..end_fence].trim().to_string();
        }
        return after_fence.trim().to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let reply = "Here you go:\n```json\n[\"a\", \"b\"]\n```\nAnything else?";
        assert_eq!(strip_code_fencing(reply), "[\"a\", \"b\"]");
    }

    #[test]
    fn test_strip_plain_fence() {
        let reply = "```\n{\"translation\": \"dog\"}\n```";
        assert_eq!(strip_code_fencing(reply), "{\"translation\": \"dog\"}");
    }

    #[test]
    fn test_unfenced_reply_is_trimmed() {
        assert_eq!(strip_code_fencing("  [\"x\"]\n"), "[\"x\"]");
    }

    #[test]
    fn test_missing_key_is_reported() {
        let settings = Settings::default();
        if std::env::var("WORTBLICK_API_KEY").is_err() {
            assert!(matches!(
                LlmClient::from_settings(&settings),
                Err(WortblickError::MissingCredential)
            ));
        }
    }
}
