//! Blocking client for `POST {base_url}/chat/completions`.
//!
//! Every non-success response is turned into [`Error::Upstream`] with an
//! [`UpstreamKind`] so callers can tell billing problems from bad keys and
//! from failures worth retrying.

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use wikirag_core::config::GenerationSettings;
use wikirag_core::error::{Error, UpstreamKind};
use wikirag_core::traits::AnswerSynthesizer;
use wikirag_core::types::QueryContext;

use crate::prompt::{build_user_prompt, SYSTEM_MESSAGE};

pub struct OpenAiSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiSynthesizer {
    /// Reads the key from the environment variable named in `settings`.
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings.api_key()?;
        Self::with_api_key(settings, &api_key)
    }

    pub fn with_api_key(settings: &GenerationSettings, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str { &self.model }

    /// Cheap authenticated call used to check the key before the first query.
    pub fn verify(&self) -> Result<()> {
        let url = format!("{}/models", self.base_url);
        let resp = self.client.get(&url).bearer_auth(&self.api_key).send().map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(classify(status, &body).into());
        }
        tracing::info!("API key verified against {}", self.base_url);
        Ok(())
    }

    fn complete(&self, query: &str, context: &QueryContext) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": build_user_prompt(query, context) },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("Requesting completion from {} ({} context chunks)", self.model, context.len());
        let resp = self.client.post(&url).bearer_auth(&self.api_key).json(&body).send().map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(classify(status, &text).into());
        }
        let json: Value = resp.json().map_err(|e| Error::Upstream { kind: UpstreamKind::Other, status: Some(status.as_u16()), message: format!("invalid response body: {e}") })?;
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| Error::Upstream { kind: UpstreamKind::Other, status: Some(status.as_u16()), message: "no choices in response".to_string() })?;
        Ok(content.trim().to_string())
    }
}

impl AnswerSynthesizer for OpenAiSynthesizer {
    fn generate(&self, query: &str, context: &QueryContext) -> Result<String> {
        self.complete(query, context)
    }
}

/// Map an HTTP failure onto the upstream taxonomy.
pub fn classify(status: StatusCode, body: &str) -> Error {
    let code = error_code(body);
    let kind = match status.as_u16() {
        429 if code.as_deref() == Some("insufficient_quota") || body.contains("insufficient_quota") => UpstreamKind::Quota,
        401 | 403 => UpstreamKind::Auth,
        408 | 429 | 500..=599 => UpstreamKind::Transient,
        _ => UpstreamKind::Other,
    };
    let message = error_message(body).unwrap_or_else(|| body.trim().to_string());
    Error::Upstream { kind, status: Some(status.as_u16()), message }
}

fn transport_error(e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() || e.is_connect() { UpstreamKind::Transient } else { UpstreamKind::Other };
    Error::Upstream { kind, status: e.status().map(|s| s.as_u16()), message: e.to_string() }
}

fn error_code(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v["error"]["code"].as_str().or_else(|| v["error"]["type"].as_str()).map(str::to_string)
}

fn error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v["error"]["message"].as_str().map(str::to_string)
}
