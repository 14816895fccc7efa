// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{ensure_success, Content, GenerationConfig, Model, Part, SseParser};
use crate::adk::error::{ModelError, RefineryError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use tokio::sync::mpsc;

const PROVIDER: &str = "Gemini";

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a new GeminiModel
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    /// Optionally uses `GEMINI_BASE_URL` for custom endpoints.
    pub fn new(model_name: impl Into<String>) -> Result<Self, RefineryError> {
        let api_key = env::var("GOOGLE_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("GOOGLE_API_KEY".to_string()))?;
        let base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name: model_name.into(),
            base_url,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model_name, method)
    }
}

/// Build the `generateContent` request body.
///
/// System turns go to `systemInstruction`; Gemini rejects a "system" role
/// inside `contents`.
pub fn build_request_body(history: &[Content], config: Option<&GenerationConfig>) -> Value {
    let system: Vec<Value> = history
        .iter()
        .filter(|c| c.role == "system")
        .flat_map(|c| c.parts.iter().filter_map(part_to_gemini_json))
        .collect();

    let contents: Vec<Value> = history
        .iter()
        .filter(|c| c.role != "system")
        .map(|c| {
            let parts: Vec<Value> = c.parts.iter().filter_map(part_to_gemini_json).collect();
            json!({ "role": c.role, "parts": parts })
        })
        .collect();

    let mut body = json!({ "contents": contents });

    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": system });
    }

    if let Some(cfg) = config {
        let mut generation = serde_json::Map::new();
        if let Some(temp) = cfg.temperature {
            generation.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tokens) = cfg.max_output_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if let Some(top_p) = cfg.top_p {
            generation.insert("topP".to_string(), json!(top_p));
        }
        if let Some(top_k) = cfg.top_k {
            generation.insert("topK".to_string(), json!(top_k));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }
    }

    body
}

/// Serialize a Part to Gemini API JSON format
/// Returns None for parts that shouldn't be sent (e.g., Thinking)
pub fn part_to_gemini_json(part: &Part) -> Option<Value> {
    match part {
        Part::Text(t) => Some(json!({ "text": t })),
        Part::Thinking(_) => None,
    }
}

/// Parse a Gemini API JSON part into Parts
pub fn parse_gemini_part(p: &Value) -> Vec<Part> {
    let mut parts = Vec::new();

    // Thought summaries arrive either as a string or as text flagged `thought: true`
    if let Some(thought) = p.get("thought").and_then(|t| t.as_str()) {
        if !thought.is_empty() {
            parts.push(Part::Thinking(thought.to_string()));
        }
    }

    if let Some(text) = p["text"].as_str() {
        if p.get("thought").and_then(|t| t.as_bool()) == Some(true) {
            parts.push(Part::Thinking(text.to_string()));
        } else {
            parts.push(Part::Text(text.to_string()));
        }
    }

    parts
}

/// Parse one `generateContent` (or streamed chunk) response.
///
/// `require_content` is false for stream chunks, which may legitimately
/// carry only a finish reason or usage metadata.
pub fn parse_gemini_response(
    resp_json: &Value,
    require_content: bool,
) -> Result<Content, RefineryError> {
    if let Some(err) = resp_json.get("error") {
        return Err(RefineryError::api(PROVIDER, err.to_string()));
    }

    let candidate = match resp_json["candidates"].as_array().and_then(|c| c.first()) {
        Some(c) => c,
        None if require_content => {
            if let Some(reason) = resp_json["promptFeedback"]["blockReason"].as_str() {
                return Err(RefineryError::api(
                    PROVIDER,
                    format!("prompt blocked: {}", reason),
                ));
            }
            return Err(RefineryError::invalid_response("No candidates in Gemini response"));
        }
        None => {
            return Ok(Content {
                role: "model".to_string(),
                parts: vec![],
            })
        }
    };

    if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        log::debug!("Gemini finish reason: {}", finish_reason);
        if finish_reason == "SAFETY" {
            return Err(RefineryError::api(
                PROVIDER,
                "response blocked due to safety filters",
            ));
        }
    }

    let parts_json = candidate["content"]["parts"].as_array();
    let parts: Vec<Part> = match parts_json {
        Some(p) => p.iter().flat_map(parse_gemini_part).collect(),
        None if require_content => {
            log::error!("No parts in Gemini candidate: {}", candidate);
            return Err(RefineryError::invalid_response(format!(
                "No content in Gemini response. Candidate: {}",
                candidate
            )));
        }
        None => vec![],
    };

    Ok(Content {
        role: "model".to_string(),
        parts,
    })
}

#[async_trait]
impl Model for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, RefineryError> {
        let body = build_request_body(history, config);
        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(self.endpoint("generateContent"))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, PROVIDER).await?;

        let resp_json: Value = resp.json().await?;
        log::debug!("Gemini response: {}", resp_json);

        parse_gemini_response(&resp_json, true)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tx: mpsc::Sender<String>,
    ) -> Result<Content, RefineryError> {
        let body = build_request_body(history, config);

        let resp = self
            .client
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, PROVIDER).await?;

        let mut bytes = Box::pin(resp.bytes_stream());
        let mut parser = SseParser::new();
        let mut parts = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                let chunk_json: Value = serde_json::from_str(&event.data)?;
                let content = parse_gemini_response(&chunk_json, false)?;
                let text = content.text();
                if !text.is_empty() {
                    let _ = tx.send(text).await;
                }
                parts.extend(content.parts);
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}
