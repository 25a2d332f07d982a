//! Generative-text collaborator: content-safety checks and the assistant
//! chat persona, over an OpenAI-compatible endpoint.
//!
//! Advisory only. Local state never depends on this client succeeding: a
//! failed safety check degrades to "not inappropriate" and a failed reply
//! degrades to a canned line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::config::AssistantConfig;

const SAFETY_PROMPT: &str = "You are a content-safety filter for a small social app. \
    Reply with a single JSON object: {\"flagged\": bool, \"reason\": string}. \
    Flag harassment, hate, threats, and sexual content involving minors. \
    Do not flag ordinary venting, sadness, or mild profanity.";

const PERSONA_PROMPT: &str = "You are Momo, the friendly Mooderia city assistant. \
    Keep replies short, warm, and practical. Never give medical advice; suggest \
    professional help for anything serious.";

const REPLY_FALLBACK: &str = "Momo is napping right now — try again in a little while.";

/// Verdict of a content-safety check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafetyVerdict {
    pub is_inappropriate: bool,
    pub reason: Option<String>,
}

/// Object-safe seam so the session layer can be exercised with a scripted
/// assistant in tests.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    async fn check_content_safety(&self, text: &str) -> SafetyVerdict;
    async fn conversational_reply(&self, text: &str) -> String;
}

pub struct GenTextClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Drop for GenTextClient {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

/// HTTPS is required for remote URLs to protect the API key in transit;
/// HTTP is allowed only for localhost model servers.
fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| format!("Invalid base_url '{}': {}", base_url, e))?;
    let host = parsed.host_str().unwrap_or("");
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let is_localhost =
                host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1";
            if is_localhost {
                warn!("Using unencrypted HTTP for local model server at '{}'", base_url);
                Ok(())
            } else {
                Err(format!(
                    "HTTP is not allowed for remote URLs (base_url: '{}'); use HTTPS",
                    base_url
                ))
            }
        }
        other => Err(format!("Unsupported URL scheme '{}' in base_url '{}'", other, base_url)),
    }
}

impl GenTextClient {
    pub fn new(config: &AssistantConfig) -> Result<Self, String> {
        validate_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// One chat-completion round trip; `None` on any transport or shape
    /// problem.
    async fn complete(&self, system: &str, user: &str) -> Option<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let resp = match self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                debug!(error = %e, "Assistant request failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "Assistant endpoint returned an error");
            return None;
        }

        let value: Value = resp.json().await.ok()?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
    }
}

/// Pull a `{"flagged": .., "reason": ..}` object out of a model reply that
/// may wrap it in prose or code fences.
fn parse_verdict(content: &str) -> Option<SafetyVerdict> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    let value: Value = serde_json::from_str(&content[start..=end]).ok()?;
    Some(SafetyVerdict {
        is_inappropriate: value["flagged"].as_bool()?,
        reason: value["reason"].as_str().map(|s| s.to_string()),
    })
}

#[async_trait]
impl AssistantProvider for GenTextClient {
    async fn check_content_safety(&self, text: &str) -> SafetyVerdict {
        match self.complete(SAFETY_PROMPT, text).await.and_then(|c| parse_verdict(&c)) {
            Some(verdict) => verdict,
            // Fail open: the check is advisory, sending must not be blocked
            // by an unreachable backend.
            None => SafetyVerdict::default(),
        }
    }

    async fn conversational_reply(&self, text: &str) -> String {
        self.complete(PERSONA_PROMPT, text)
            .await
            .unwrap_or_else(|| REPLY_FALLBACK.to_string())
    }
}
