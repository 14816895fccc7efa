// SPDX-License-Identifier: MIT

//! Shared research state and its reducer
//!
//! Nodes never mutate [`ResearchState`] directly. Each returns a
//! [`StateDelta`] and the engine folds it in with [`ResearchState::apply`]:
//! scalar fields overwrite, messages append.

use serde::{Deserialize, Serialize};

/// One entry of the run's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent: String,
    pub content: String,
}

impl AgentMessage {
    pub fn new(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            content: content.into(),
        }
    }
}

/// The single record threaded through every node of a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchState {
    pub topic: String,
    pub research_content: String,
    pub review_feedback: String,
    pub fact_check_results: String,
    pub citation_results: String,
    pub quality_score: f64,
    pub iteration: u32,
    pub agent_messages: Vec<AgentMessage>,
    pub final_document: String,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Fold a node's partial update into the state
    pub fn apply(&mut self, delta: StateDelta) {
        let StateDelta {
            research_content,
            review_feedback,
            fact_check_results,
            citation_results,
            quality_score,
            iteration,
            agent_messages,
            final_document,
        } = delta;

        if let Some(v) = research_content {
            self.research_content = v;
        }
        if let Some(v) = review_feedback {
            self.review_feedback = v;
        }
        if let Some(v) = fact_check_results {
            self.fact_check_results = v;
        }
        if let Some(v) = citation_results {
            self.citation_results = v;
        }
        if let Some(v) = quality_score {
            self.quality_score = v;
        }
        if let Some(v) = iteration {
            self.iteration = v;
        }
        if let Some(v) = final_document {
            self.final_document = v;
        }
        self.agent_messages.extend(agent_messages);
    }

    pub fn is_finalized(&self) -> bool {
        !self.final_document.is_empty()
    }
}

/// Partial update produced by one node. The topic is not expressible here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_check_results: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_results: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_messages: Vec<AgentMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_document: Option<String>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn research_content(mut self, v: impl Into<String>) -> Self {
        self.research_content = Some(v.into());
        self
    }

    pub fn review_feedback(mut self, v: impl Into<String>) -> Self {
        self.review_feedback = Some(v.into());
        self
    }

    pub fn fact_check_results(mut self, v: impl Into<String>) -> Self {
        self.fact_check_results = Some(v.into());
        self
    }

    pub fn citation_results(mut self, v: impl Into<String>) -> Self {
        self.citation_results = Some(v.into());
        self
    }

    pub fn quality_score(mut self, v: f64) -> Self {
        self.quality_score = Some(v);
        self
    }

    pub fn iteration(mut self, v: u32) -> Self {
        self.iteration = Some(v);
        self
    }

    pub fn message(mut self, agent: impl Into<String>, content: impl Into<String>) -> Self {
        self.agent_messages.push(AgentMessage::new(agent, content));
        self
    }

    pub fn final_document(mut self, v: impl Into<String>) -> Self {
        self.final_document = Some(v.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ResearchState::new("tidal power");
        assert_eq!(state.topic, "tidal power");
        assert_eq!(state.iteration, 0);
        assert_eq!(state.quality_score, 0.0);
        assert!(state.agent_messages.is_empty());
        assert!(!state.is_finalized());
    }

    #[test]
    fn test_apply_overwrites_only_set_fields() {
        let mut state = ResearchState::new("t");
        state.apply(
            StateDelta::new()
                .research_content("draft")
                .review_feedback("good"),
        );
        state.apply(StateDelta::new().research_content("draft 2"));

        assert_eq!(state.research_content, "draft 2");
        assert_eq!(state.review_feedback, "good");
        assert_eq!(state.topic, "t");
    }

    #[test]
    fn test_apply_appends_messages_in_order() {
        let mut state = ResearchState::new("t");
        state.apply(StateDelta::new().message("researcher", "a"));
        state.apply(StateDelta::new().message("reviewer", "b"));
        state.apply(StateDelta::new().final_document("a"));

        let agents: Vec<&str> = state.agent_messages.iter().map(|m| m.agent.as_str()).collect();
        assert_eq!(agents, vec!["researcher", "reviewer"]);
        assert!(state.is_finalized());
    }

    #[test]
    fn test_delta_serialization_omits_unset_fields() {
        let delta = StateDelta::new().iteration(1).message("editor", "v2");
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "iteration": 1,
                "agent_messages": [{ "agent": "editor", "content": "v2" }]
            })
        );
    }
}
