// SPDX-License-Identifier: MIT

//! Agent module - defines agent types for AI workflows
//!
//! This module provides the core Agent trait and its LLM-backed
//! implementation:
//! - `LLMAgent` - a persona (system prompt) over one model

mod llm;

pub use llm::LLMAgent;

use crate::adk::error::RefineryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One prompt/response exchange kept in an agent's local memory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub input: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Produce text for the given prompt
    async fn invoke(&self, input: String) -> Result<String, RefineryError>;

    /// Produce text while forwarding partial chunks to `tx`.
    ///
    /// The chunks concatenate to the returned text.
    async fn invoke_stream(
        &self,
        input: String,
        tx: mpsc::Sender<String>,
    ) -> Result<String, RefineryError> {
        // Default implementation falls back to invoke()
        let res = self.invoke(input).await?;
        let _ = tx.send(res.clone()).await;
        Ok(res)
    }

    /// Exchanges recorded so far, oldest first
    fn memory(&self) -> Vec<MemoryRecord> {
        Vec::new()
    }

    fn clear_memory(&self) {}
}
