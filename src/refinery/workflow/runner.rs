// SPDX-License-Identifier: MIT

//! Outward entry point: build the agents, then run or stream a topic

use crate::adk::error::RefineryError;
use crate::refinery::agents::{AgentFactory, AgentSet};
use crate::refinery::config::{ModelDistribution, Settings, WorkflowConfig};
use crate::refinery::workflow::engine::{NodeUpdate, RunFailure, WorkflowEngine};
use crate::refinery::workflow::nodes::NodeContext;
use crate::refinery::workflow::state::ResearchState;

use futures::stream::BoxStream;
use tokio::sync::mpsc;

/// Owns one agent set; every run gets a fresh engine and tool manager
pub struct WorkflowRunner {
    agents: AgentSet,
    config: WorkflowConfig,
    chunks: Option<mpsc::Sender<String>>,
}

impl WorkflowRunner {
    /// Build agents for `distribution` (or the configured one).
    ///
    /// Unknown models, missing API keys and invalid limits fail here,
    /// before any node runs.
    pub fn new(
        distribution: Option<ModelDistribution>,
        settings: &Settings,
    ) -> Result<Self, RefineryError> {
        settings.workflow.validate()?;
        let distribution = distribution.unwrap_or_else(|| settings.distribution.clone());
        for (role, model) in distribution.resolved() {
            log::debug!("Role {} -> {}", role, model);
        }
        let agents = AgentFactory::new(settings).build(&distribution)?;
        Self::with_agents(agents, settings.workflow)
    }

    /// Runner over caller-supplied agents
    pub fn with_agents(agents: AgentSet, config: WorkflowConfig) -> Result<Self, RefineryError> {
        config.validate()?;
        Ok(Self {
            agents,
            config,
            chunks: None,
        })
    }

    /// Forward every agent's output chunks to `tx` while nodes run
    pub fn with_chunks(mut self, tx: mpsc::Sender<String>) -> Self {
        self.chunks = Some(tx);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn agents(&self) -> &AgentSet {
        &self.agents
    }

    fn engine(&self) -> WorkflowEngine {
        let mut ctx = NodeContext::new(self.agents.clone());
        if let Some(tx) = &self.chunks {
            ctx = ctx.with_chunks(tx.clone());
        }
        WorkflowEngine::from_validated(ctx, &self.config)
    }

    /// Run `topic` to completion. On failure the partial state is kept in
    /// the returned [`RunFailure`].
    pub async fn run(&self, topic: impl Into<String>) -> Result<ResearchState, RunFailure> {
        self.engine().run(topic).await
    }

    /// Per-node updates, executed as the stream is polled
    pub fn stream(
        &self,
        topic: impl Into<String>,
    ) -> BoxStream<'static, Result<NodeUpdate, RunFailure>> {
        self.engine().stream(topic)
    }
}
