// SPDX-License-Identifier: MIT

//! Workflow engine
//!
//! Sequences the nodes, merges their deltas and asks the convergence policy
//! where to go after each editor pass. Run-to-completion and streaming both
//! drive the same [`Execution`], one node per step:
//!
//! ```text
//! research -> review -> fact_check -> citation -> editor -> {review | finalize}
//! ```

use crate::adk::error::{RefineryError, WorkflowError};
use crate::refinery::agents::AgentSet;
use crate::refinery::config::WorkflowConfig;
use crate::refinery::workflow::convergence::ConvergencePolicy;
use crate::refinery::workflow::nodes::{NodeContext, NodeName};
use crate::refinery::workflow::state::{ResearchState, StateDelta};

use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// One executed node and the delta it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeUpdate {
    pub node: NodeName,
    pub delta: StateDelta,
}

/// A run that stopped because a node failed. The state is as it was
/// before the failing node; it never has a final document.
#[derive(Debug, Error)]
#[error("Workflow failed at node '{node}': {error}")]
pub struct RunFailure {
    pub node: NodeName,
    #[source]
    pub error: RefineryError,
    pub state: ResearchState,
}

impl From<RunFailure> for RefineryError {
    fn from(failure: RunFailure) -> Self {
        WorkflowError::node_failed(failure.node.as_str(), failure.error).into()
    }
}

#[derive(Clone)]
pub struct WorkflowEngine {
    ctx: Arc<NodeContext>,
    policy: ConvergencePolicy,
}

impl WorkflowEngine {
    pub fn new(ctx: NodeContext, config: &WorkflowConfig) -> Result<Self, RefineryError> {
        config.validate()?;
        Ok(Self::from_validated(ctx, config))
    }

    pub(crate) fn from_validated(ctx: NodeContext, config: &WorkflowConfig) -> Self {
        Self {
            ctx: Arc::new(ctx),
            policy: ConvergencePolicy::new(config),
        }
    }

    /// Engine with a fresh tool manager over `agents`
    pub fn with_agents(agents: AgentSet, config: &WorkflowConfig) -> Result<Self, RefineryError> {
        Self::new(NodeContext::new(agents), config)
    }

    /// Begin a run; nothing executes until the first step
    pub fn start(&self, topic: impl Into<String>) -> Execution {
        let execution = Execution {
            run_id: Uuid::new_v4(),
            engine: self.clone(),
            state: ResearchState::new(topic),
            next: Some(NodeName::ENTRY),
        };
        log::info!(
            "[{}] Starting workflow for topic '{}'",
            execution.run_id,
            execution.state.topic
        );
        execution
    }

    /// Execute every node until finalize or the first failure
    pub async fn run(&self, topic: impl Into<String>) -> Result<ResearchState, RunFailure> {
        let mut execution = self.start(topic);
        while let Some(node) = execution.next_node() {
            execution.advance(node).await.map_err(|error| RunFailure {
                node,
                error,
                state: execution.state.clone(),
            })?;
        }
        Ok(execution.into_state())
    }

    /// Lazily execute the workflow, yielding one update per node.
    ///
    /// Each node runs only when the stream is polled. A failure is yielded
    /// as the last item.
    pub fn stream(
        &self,
        topic: impl Into<String>,
    ) -> BoxStream<'static, Result<NodeUpdate, RunFailure>> {
        let execution = self.start(topic);
        stream::unfold(Some(execution), |execution| async move {
            let mut execution = execution?;
            let node = execution.next_node()?;
            match execution.advance(node).await {
                Ok(update) => Some((Ok(update), Some(execution))),
                Err(error) => {
                    let failure = RunFailure {
                        node,
                        error,
                        state: execution.state.clone(),
                    };
                    Some((Err(failure), None))
                }
            }
        })
        .boxed()
    }
}

/// A single in-progress run
pub struct Execution {
    run_id: Uuid,
    engine: WorkflowEngine,
    state: ResearchState,
    next: Option<NodeName>,
}

impl Execution {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> &ResearchState {
        &self.state
    }

    /// Node the next step will execute; `None` once finished or failed
    pub fn next_node(&self) -> Option<NodeName> {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    pub fn into_state(self) -> ResearchState {
        self.state
    }

    /// Execute one node and pick its successor
    pub async fn step(&mut self) -> Result<NodeUpdate, RefineryError> {
        let node = self.next.ok_or(WorkflowError::AlreadyFinished)?;
        self.advance(node)
            .await
            .map_err(|error| WorkflowError::node_failed(node.as_str(), error).into())
    }

    async fn advance(&mut self, node: NodeName) -> Result<NodeUpdate, RefineryError> {
        log::info!("[{}] Executing node: {}", self.run_id, node);
        let delta = match node.execute(&self.state, &self.engine.ctx).await {
            Ok(delta) => delta,
            Err(e) => {
                log::error!("[{}] Node {} failed: {}", self.run_id, node, e);
                self.next = None;
                return Err(e);
            }
        };

        self.state.apply(delta.clone());
        self.next = match node {
            NodeName::Editor => Some(self.engine.policy.decide(&self.state).target()),
            other => other.next(),
        };

        log::info!(
            "[{}] Node {} completed (iteration {}, quality {:.3})",
            self.run_id,
            node,
            self.state.iteration,
            self.state.quality_score
        );
        if self.is_finished() {
            log::info!(
                "[{}] Workflow finished after {} iteration(s)",
                self.run_id,
                self.state.iteration
            );
        }

        Ok(NodeUpdate { node, delta })
    }
}
