// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat completions (OpenAI, Groq)

use super::{ensure_success, Content, GenerationConfig, Model, Part, SseParser};
use crate::adk::error::{ModelError, RefineryError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use tokio::sync::mpsc;

/// Chat-completions model for any OpenAI-compatible endpoint
pub struct OpenAIModel {
    client: Client,
    provider: String,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: impl Into<String>) -> Result<Self, RefineryError> {
        Self::from_env(
            "OpenAI",
            "OPENAI_API_KEY",
            "OPENAI_BASE_URL",
            "https://api.openai.com/v1",
            model_name.into(),
        )
    }

    /// Create a model served by Groq's OpenAI-compatible API
    ///
    /// Requires `GROQ_API_KEY`; optionally uses `GROQ_BASE_URL`.
    pub fn groq(model_name: impl Into<String>) -> Result<Self, RefineryError> {
        Self::from_env(
            "Groq",
            "GROQ_API_KEY",
            "GROQ_BASE_URL",
            "https://api.groq.com/openai/v1",
            model_name.into(),
        )
    }

    fn from_env(
        provider: &str,
        key_var: &str,
        url_var: &str,
        default_url: &str,
        model_name: String,
    ) -> Result<Self, RefineryError> {
        let api_key =
            env::var(key_var).map_err(|_| ModelError::ApiKeyMissing(key_var.to_string()))?;
        let base_url = env::var(url_var).unwrap_or_else(|_| default_url.to_string());

        Ok(Self {
            client: Client::new(),
            provider: provider.to_string(),
            api_key,
            model_name,
            base_url,
        })
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect();

        json!({ "role": role, "content": text })
    }

    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        stream: bool,
    ) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        if stream {
            body["stream"] = json!(true);
        }

        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &Value) -> Result<Content, RefineryError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| RefineryError::invalid_response("No choices in OpenAI response"))?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        // Reasoning models on Groq return their trace separately
        if let Some(reasoning) = message["reasoning"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }

    /// Extract the text delta from one streamed chunk
    fn parse_stream_delta(chunk: &Value) -> Option<&str> {
        chunk["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|c| c["delta"]["content"].as_str())
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, RefineryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, config, false);

        log::debug!(
            "{} request body: {}",
            self.provider,
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, &self.provider).await?;

        let resp_json: Value = resp.json().await?;
        log::debug!("{} response: {}", self.provider, resp_json);

        Self::parse_openai_response(&resp_json)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tx: mpsc::Sender<String>,
    ) -> Result<Content, RefineryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, config, true);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, &self.provider).await?;

        let mut bytes = Box::pin(resp.bytes_stream());
        let mut parser = SseParser::new();
        let mut text = String::new();

        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                if event.data.trim() == "[DONE]" {
                    break 'outer;
                }
                let chunk_json: Value = serde_json::from_str(&event.data)?;
                if let Some(err) = chunk_json.get("error") {
                    return Err(RefineryError::api(&self.provider, err.to_string()));
                }
                if let Some(delta) = Self::parse_stream_delta(&chunk_json) {
                    text.push_str(delta);
                    let _ = tx.send(delta.to_string()).await;
                }
            }
        }

        Ok(Content::model(text))
    }
}
