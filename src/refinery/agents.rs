// SPDX-License-Identifier: MIT

//! Agent roles and the factory that binds each role to a model
//!
//! Every workflow run gets its own [`AgentSet`], built from an explicit
//! [`ModelDistribution`]; nothing here is process-global.

use crate::adk::agent::{Agent, LLMAgent};
use crate::adk::error::RefineryError;
use crate::adk::model::anthropic::AnthropicModel;
use crate::adk::model::gemini::GeminiModel;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::{GenerationConfig, Model};
use crate::refinery::config::{ModelDistribution, ModelId, Settings};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The five personas of the refinement pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Researcher,
    Reviewer,
    Editor,
    FactChecker,
    CitationValidator,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Researcher,
        AgentRole::Reviewer,
        AgentRole::Editor,
        AgentRole::FactChecker,
        AgentRole::CitationValidator,
    ];

    /// Key used in distributions and in the message log
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "researcher",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Editor => "editor",
            AgentRole::FactChecker => "fact_checker",
            AgentRole::CitationValidator => "citation_validator",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "Researcher",
            AgentRole::Reviewer => "Reviewer",
            AgentRole::Editor => "Editor",
            AgentRole::FactChecker => "FactChecker",
            AgentRole::CitationValidator => "CitationValidator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "Content Generation",
            AgentRole::Reviewer => "Quality Assurance",
            AgentRole::Editor => "Content Refinement",
            AgentRole::FactChecker => "Verification",
            AgentRole::CitationValidator => "Source Validation",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Researcher => {
                "You are a Research Agent in an AI research lab.
Your role: Generate comprehensive research content on given topics.
- Synthesize information from multiple perspectives
- Structure content logically with clear sections
- Provide evidence-based claims
- Maintain academic rigor
Output format: Structured research text with clear sections."
            }
            AgentRole::Reviewer => {
                "You are a Reviewer Agent in an AI research lab.
Your role: Critically evaluate research content for quality and accuracy.
- Identify logical inconsistencies and gaps
- Assess methodological rigor
- Check claim validity
- Provide constructive feedback with specific improvement suggestions
Output format: JSON with {score: 0-1, issues: [], suggestions: []}"
            }
            AgentRole::Editor => {
                "You are an Editor Agent in an AI research lab.
Your role: Refine and synthesize research content based on feedback.
- Incorporate reviewer suggestions
- Ensure coherence and flow
- Maintain consistent tone and style
- Resolve contradictions
Output format: Improved research text addressing all feedback."
            }
            AgentRole::FactChecker => {
                "You are a Fact-Checker Agent in an AI research lab.
Your role: Verify factual accuracy and identify unsupported claims.
- Cross-reference claims for consistency
- Flag unsubstantiated statements
- Assess evidence quality
- Detect potential biases
Output format: JSON with {verified: [], flagged: [], confidence: 0-1}"
            }
            AgentRole::CitationValidator => {
                "You are a Citation Validator Agent in an AI research lab.
Your role: Ensure proper citation and source attribution.
- Identify claims needing citations
- Validate citation formats
- Check source relevance
- Track provenance
Output format: JSON with {missing_citations: [], invalid_formats: [], score: 0-1}"
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| RefineryError::config(format!("Unknown agent role: {}", s)))
    }
}

/// One agent per role, owned by a single workflow run
#[derive(Clone)]
pub struct AgentSet {
    pub researcher: Arc<dyn Agent>,
    pub reviewer: Arc<dyn Agent>,
    pub editor: Arc<dyn Agent>,
    pub fact_checker: Arc<dyn Agent>,
    pub citation_validator: Arc<dyn Agent>,
}

impl AgentSet {
    /// Build a set by asking `make` for each role's agent
    pub fn from_fn<F>(mut make: F) -> Self
    where
        F: FnMut(AgentRole) -> Arc<dyn Agent>,
    {
        Self {
            researcher: make(AgentRole::Researcher),
            reviewer: make(AgentRole::Reviewer),
            editor: make(AgentRole::Editor),
            fact_checker: make(AgentRole::FactChecker),
            citation_validator: make(AgentRole::CitationValidator),
        }
    }

    pub fn get(&self, role: AgentRole) -> &Arc<dyn Agent> {
        match role {
            AgentRole::Researcher => &self.researcher,
            AgentRole::Reviewer => &self.reviewer,
            AgentRole::Editor => &self.editor,
            AgentRole::FactChecker => &self.fact_checker,
            AgentRole::CitationValidator => &self.citation_validator,
        }
    }
}

/// Factory for creating the agent set of a run
pub struct AgentFactory<'a> {
    settings: &'a Settings,
}

impl<'a> AgentFactory<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build every role's agent. Fails before any model call if a
    /// provider is not configured.
    pub fn build(&self, distribution: &ModelDistribution) -> Result<AgentSet, RefineryError> {
        Ok(AgentSet {
            researcher: self.build_role(AgentRole::Researcher, distribution)?,
            reviewer: self.build_role(AgentRole::Reviewer, distribution)?,
            editor: self.build_role(AgentRole::Editor, distribution)?,
            fact_checker: self.build_role(AgentRole::FactChecker, distribution)?,
            citation_validator: self.build_role(AgentRole::CitationValidator, distribution)?,
        })
    }

    fn build_role(
        &self,
        role: AgentRole,
        distribution: &ModelDistribution,
    ) -> Result<Arc<dyn Agent>, RefineryError> {
        let model_id = distribution.get(role);
        log::info!("Building agent '{}' on model '{}'", role, model_id);
        let model = self.create_model(model_id)?;
        Ok(self.build_agent(role, model))
    }

    /// Wrap a model in the persona for `role`
    pub fn build_agent(&self, role: AgentRole, model: Arc<dyn Model>) -> Arc<dyn Agent> {
        Arc::new(
            LLMAgent::new(
                role.display_name().to_string(),
                role.description().to_string(),
                role.system_prompt().to_string(),
                model,
            )
            .with_config(GenerationConfig::with_temperature(
                self.settings.models.temperature,
            )),
        )
    }

    /// Create the model instance for a model identifier
    pub fn create_model(&self, id: ModelId) -> Result<Arc<dyn Model>, RefineryError> {
        let model_name = self.settings.models.model_name(id).to_string();
        log::debug!("Using provider '{}' with model '{}'", id, model_name);

        match id {
            ModelId::Gemini => Ok(Arc::new(GeminiModel::new(model_name)?)),
            ModelId::Groq => Ok(Arc::new(OpenAIModel::groq(model_name)?)),
            ModelId::OpenAI => Ok(Arc::new(OpenAIModel::new(model_name)?)),
            ModelId::Anthropic => Ok(Arc::new(AnthropicModel::new(model_name)?)),
        }
    }
}
