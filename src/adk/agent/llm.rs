// SPDX-License-Identifier: MIT

//! LLM Agent - a system-prompted persona over one model
//!
//! Every successful call is recorded in the agent's own memory. An empty
//! reply is an error: callers never continue with blank text.

use super::{Agent, MemoryRecord};
use crate::adk::error::{ModelError, RefineryError};
use crate::adk::model::{Content, GenerationConfig, Model};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Standard LLM agent
pub struct LLMAgent {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub config: Option<GenerationConfig>,
    memory: Mutex<Vec<MemoryRecord>>,
}

impl LLMAgent {
    pub fn new(
        name: String,
        description: String,
        instruction: String,
        model: Arc<dyn Model>,
    ) -> Self {
        Self {
            name,
            description,
            instruction,
            model,
            config: None,
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    fn history(&self, input: &str) -> Vec<Content> {
        vec![Content::system(self.instruction.clone()), Content::user(input)]
    }

    fn finish(&self, input: String, text: String) -> Result<String, RefineryError> {
        if text.trim().is_empty() {
            log::error!("Agent {} received empty response", self.name);
            return Err(ModelError::EmptyResponse(self.name.clone()).into());
        }

        log::info!(
            "Agent {} returning text response (length: {}, preview: '{}')",
            self.name,
            text.len(),
            preview(&text, 100)
        );

        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MemoryRecord::new(input, text.clone()));
        Ok(text)
    }
}

/// Longest prefix of `text` of at most `max` bytes ending on a char boundary
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: String) -> Result<String, RefineryError> {
        log::info!(
            "Agent {} invoking model {}",
            self.name,
            self.model.model_name()
        );
        let response = self
            .model
            .generate_content(&self.history(&input), self.config.as_ref())
            .await?;

        self.finish(input, response.text())
    }

    async fn invoke_stream(
        &self,
        input: String,
        tx: mpsc::Sender<String>,
    ) -> Result<String, RefineryError> {
        log::info!(
            "Agent {} streaming from model {}",
            self.name,
            self.model.model_name()
        );
        let response = self
            .model
            .stream_content(&self.history(&input), self.config.as_ref(), tx)
            .await?;

        self.finish(input, response.text())
    }

    fn memory(&self) -> Vec<MemoryRecord> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_memory(&self) {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
