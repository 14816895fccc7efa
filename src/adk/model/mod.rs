// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [gemini] - Google's Gemini API
//! - [openai] - OpenAI-compatible chat completions (OpenAI, Groq)

pub mod anthropic;
pub mod gemini;
pub mod openai;
mod sse;

pub use sse::{SseEvent, SseParser};

use crate::adk::error::{ModelError, RefineryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl GenerationConfig {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models (never part of the answer)
    Thinking(String),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, skipping thinking
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Provider-side model name, used in logs
    fn model_name(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, RefineryError>;

    /// Generate while forwarding text chunks as they arrive.
    ///
    /// The returned content's text equals the concatenation of the chunks sent.
    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tx: mpsc::Sender<String>,
    ) -> Result<Content, RefineryError> {
        // Default implementation sends the whole reply as one chunk
        let content = self.generate_content(history, config).await?;
        let text = content.text();
        if !text.is_empty() {
            let _ = tx.send(text).await;
        }
        Ok(content)
    }
}

/// Turn a non-success HTTP response into a provider error
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, RefineryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ModelError::RateLimited { retry_after_secs }.into());
    }

    let text = resp.text().await?;
    Err(RefineryError::api(provider, format!("{}: {}", status, text)))
}
