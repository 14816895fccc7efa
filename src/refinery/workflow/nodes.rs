// SPDX-License-Identifier: MIT

//! The six workflow nodes
//!
//! Each node reads the current state, calls at most one agent (and
//! optionally one tool) and returns a [`StateDelta`]. Agent failures are
//! propagated unchanged and a blank reply counts as one; the engine decides
//! what they mean for the run.

use crate::adk::error::{ModelError, RefineryError};
use crate::refinery::agents::{AgentRole, AgentSet};
use crate::refinery::tools::ToolManager;
use crate::refinery::workflow::state::{ResearchState, StateDelta};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

pub const REQUIRED_SECTIONS: [&str; 3] = ["introduction", "findings", "conclusion"];

const REVIEW_CONTENT_CHARS: usize = 500;
const FACT_CHECK_CONTENT_CHARS: usize = 400;
const CITATION_CONTENT_CHARS: usize = 400;
const EDITOR_CONTENT_CHARS: usize = 500;
const EDITOR_FEEDBACK_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Research,
    Review,
    FactCheck,
    Citation,
    Editor,
    Finalize,
}

impl NodeName {
    pub const ALL: [NodeName; 6] = [
        NodeName::Research,
        NodeName::Review,
        NodeName::FactCheck,
        NodeName::Citation,
        NodeName::Editor,
        NodeName::Finalize,
    ];

    pub const ENTRY: NodeName = NodeName::Research;

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Research => "research",
            NodeName::Review => "review",
            NodeName::FactCheck => "fact_check",
            NodeName::Citation => "citation",
            NodeName::Editor => "editor",
            NodeName::Finalize => "finalize",
        }
    }

    /// Agent the node delegates to; finalize has none
    pub fn role(&self) -> Option<AgentRole> {
        match self {
            NodeName::Research => Some(AgentRole::Researcher),
            NodeName::Review => Some(AgentRole::Reviewer),
            NodeName::FactCheck => Some(AgentRole::FactChecker),
            NodeName::Citation => Some(AgentRole::CitationValidator),
            NodeName::Editor => Some(AgentRole::Editor),
            NodeName::Finalize => None,
        }
    }

    /// Unconditional successor. `None` after editor (policy decides) and
    /// after finalize (end of run).
    pub fn next(&self) -> Option<NodeName> {
        match self {
            NodeName::Research => Some(NodeName::Review),
            NodeName::Review => Some(NodeName::FactCheck),
            NodeName::FactCheck => Some(NodeName::Citation),
            NodeName::Citation => Some(NodeName::Editor),
            NodeName::Editor | NodeName::Finalize => None,
        }
    }

    /// Run this node against `state`
    pub async fn execute(
        &self,
        state: &ResearchState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, RefineryError> {
        match self {
            NodeName::Research => research(state, ctx).await,
            NodeName::Review => review(state, ctx).await,
            NodeName::FactCheck => fact_check(state, ctx).await,
            NodeName::Citation => citation(state, ctx).await,
            NodeName::Editor => editor(state, ctx).await,
            NodeName::Finalize => Ok(finalize(state)),
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node may use besides the state
pub struct NodeContext {
    pub agents: AgentSet,
    pub tools: ToolManager,
    chunks: Option<mpsc::Sender<String>>,
}

impl NodeContext {
    pub fn new(agents: AgentSet) -> Self {
        Self {
            agents,
            tools: ToolManager::new(),
            chunks: None,
        }
    }

    /// Forward agent output chunks to `tx` as they arrive
    pub fn with_chunks(mut self, tx: mpsc::Sender<String>) -> Self {
        self.chunks = Some(tx);
        self
    }

    async fn invoke(&self, role: AgentRole, prompt: String) -> Result<String, RefineryError> {
        log::debug!("Prompt for {}: {}", role, prompt);
        let agent = self.agents.get(role);
        let reply = match &self.chunks {
            Some(tx) => agent.invoke_stream(prompt, tx.clone()).await?,
            None => agent.invoke(prompt).await?,
        };
        if reply.trim().is_empty() {
            return Err(ModelError::EmptyResponse(agent.name().to_string()).into());
        }
        Ok(reply)
    }
}

pub async fn research(state: &ResearchState, ctx: &NodeContext) -> Result<StateDelta, RefineryError> {
    let content = ctx
        .invoke(AgentRole::Researcher, research_prompt(state))
        .await?;

    Ok(StateDelta::new()
        .research_content(content.clone())
        .message(AgentRole::Researcher.as_str(), content))
}

pub async fn review(state: &ResearchState, ctx: &NodeContext) -> Result<StateDelta, RefineryError> {
    let metrics = ctx.tools.evaluate_quality(
        &state.research_content,
        &state.fact_check_results,
        &REQUIRED_SECTIONS,
    );
    log::debug!("Quality metrics: {:?}", metrics);

    let feedback = ctx
        .invoke(AgentRole::Reviewer, review_prompt(state))
        .await?;

    let score = match parse_review_score(&feedback) {
        Some(score) => score,
        None => {
            log::warn!(
                "Reviewer reply has no usable score, using heuristic score {}",
                metrics.overall
            );
            metrics.overall
        }
    };

    Ok(StateDelta::new()
        .review_feedback(feedback.clone())
        .quality_score(score)
        .message(AgentRole::Reviewer.as_str(), feedback))
}

pub async fn fact_check(
    state: &ResearchState,
    ctx: &NodeContext,
) -> Result<StateDelta, RefineryError> {
    let validation = ctx.tools.validate_facts(&state.research_content, "");
    log::debug!(
        "Fact validation: {} claims, {} flagged",
        validation.total_claims,
        validation.flagged.len()
    );
    let bias = ctx.tools.detect_bias(&state.research_content);
    if bias.bias_count > 0 || bias.contradiction_count > 0 {
        log::info!(
            "Bias markers: {} keywords, {} contradictions",
            bias.bias_count,
            bias.contradiction_count
        );
    }

    let results = ctx
        .invoke(AgentRole::FactChecker, fact_check_prompt(state))
        .await?;

    Ok(StateDelta::new()
        .fact_check_results(results.clone())
        .message(AgentRole::FactChecker.as_str(), results))
}

pub async fn citation(
    state: &ResearchState,
    ctx: &NodeContext,
) -> Result<StateDelta, RefineryError> {
    let report = ctx.tools.validate_citations(&state.research_content);
    log::debug!(
        "Citations found: {} {:?}",
        report.citations_found,
        report.citations
    );

    let results = ctx
        .invoke(AgentRole::CitationValidator, citation_prompt(state))
        .await?;

    Ok(StateDelta::new()
        .citation_results(results.clone())
        .message(AgentRole::CitationValidator.as_str(), results))
}

pub async fn editor(state: &ResearchState, ctx: &NodeContext) -> Result<StateDelta, RefineryError> {
    let refined = ctx
        .invoke(AgentRole::Editor, editor_prompt(state))
        .await?;

    Ok(StateDelta::new()
        .research_content(refined.clone())
        .iteration(state.iteration + 1)
        .message(AgentRole::Editor.as_str(), refined))
}

pub fn finalize(state: &ResearchState) -> StateDelta {
    StateDelta::new().final_document(state.research_content.clone())
}

pub fn research_prompt(state: &ResearchState) -> String {
    let mut prompt = format!(
        "Research topic: {}\n\nGenerate concise research content with key findings.",
        state.topic
    );
    if !state.research_content.is_empty() {
        prompt.push_str(&format!(
            "\n\nPrevious draft: {}",
            truncate_chars(&state.research_content, REVIEW_CONTENT_CHARS)
        ));
    }
    prompt
}

pub fn review_prompt(state: &ResearchState) -> String {
    format!(
        "Review: {}\n\nProvide brief feedback and score (0-1).",
        truncate_chars(&state.research_content, REVIEW_CONTENT_CHARS)
    )
}

pub fn fact_check_prompt(state: &ResearchState) -> String {
    format!(
        "Fact-check: {}\n\nQuick validation.",
        truncate_chars(&state.research_content, FACT_CHECK_CONTENT_CHARS)
    )
}

pub fn citation_prompt(state: &ResearchState) -> String {
    format!(
        "Check citations: {}\n\nBrief validation.",
        truncate_chars(&state.research_content, CITATION_CONTENT_CHARS)
    )
}

pub fn editor_prompt(state: &ResearchState) -> String {
    format!(
        "Refine: {}\n\nFeedback: {}\n\nProduce improved version.",
        truncate_chars(&state.research_content, EDITOR_CONTENT_CHARS),
        truncate_chars(&state.review_feedback, EDITOR_FEEDBACK_CHARS)
    )
}

/// Score from a reviewer reply of the form `{"score": 0.8, ...}`, optionally
/// inside a ```json fence. Clamped to [0, 1]; `None` when absent or not a
/// finite number.
pub fn parse_review_score(reply: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(strip_code_fence(reply)).ok()?;
    let score = match value.get("score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    score.is_finite().then(|| score.clamp(0.0, 1.0))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
