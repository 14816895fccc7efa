// SPDX-License-Identifier: MIT

//! Run configuration
//!
//! [`Settings`] is loaded once (YAML file, then environment overrides) and
//! handed to the runner. Workflow limits are validated here so a bad value
//! fails before any node executes.

use crate::adk::error::{ModelError, RefineryError, WorkflowError};
use crate::refinery::agents::AgentRole;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MAX_ITERATIONS: u32 = 2;
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.7;

/// Backing model identifier a role can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    #[serde(alias = "google")]
    Gemini,
    Groq,
    OpenAI,
    #[serde(alias = "claude")]
    Anthropic,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gemini => "gemini",
            ModelId::Groq => "groq",
            ModelId::OpenAI => "openai",
            ModelId::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = RefineryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelId::Gemini),
            "groq" => Ok(ModelId::Groq),
            "openai" => Ok(ModelId::OpenAI),
            "anthropic" | "claude" => Ok(ModelId::Anthropic),
            _ => Err(ModelError::UnknownModel(s.to_string()).into()),
        }
    }
}

/// Role → model assignment for one run.
///
/// Roles without an explicit entry use the default assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ModelDistribution {
    assignments: BTreeMap<AgentRole, ModelId>,
}

impl ModelDistribution {
    /// Researcher, editor and citation validator on Gemini; reviewer and
    /// fact checker on Groq.
    pub fn default_for(role: AgentRole) -> ModelId {
        match role {
            AgentRole::Researcher | AgentRole::Editor | AgentRole::CitationValidator => {
                ModelId::Gemini
            }
            AgentRole::Reviewer | AgentRole::FactChecker => ModelId::Groq,
        }
    }

    pub fn get(&self, role: AgentRole) -> ModelId {
        self.assignments
            .get(&role)
            .copied()
            .unwrap_or_else(|| Self::default_for(role))
    }

    pub fn set(&mut self, role: AgentRole, model: ModelId) {
        self.assignments.insert(role, model);
    }

    /// Assign every role to the same model
    pub fn uniform(model: ModelId) -> Self {
        let mut dist = Self::default();
        for role in AgentRole::ALL {
            dist.set(role, model);
        }
        dist
    }

    /// Build from `(role, model)` name pairs, rejecting unknown names
    pub fn from_pairs<I, R, M>(pairs: I) -> Result<Self, RefineryError>
    where
        I: IntoIterator<Item = (R, M)>,
        R: AsRef<str>,
        M: AsRef<str>,
    {
        let mut dist = Self::default();
        for (role, model) in pairs {
            dist.set(role.as_ref().parse()?, model.as_ref().parse()?);
        }
        Ok(dist)
    }

    /// Parse a `role=model` assignment as given on the command line
    pub fn parse_assignment(s: &str) -> Result<(AgentRole, ModelId), RefineryError> {
        let (role, model) = s.split_once('=').ok_or_else(|| {
            RefineryError::config(format!("Expected role=model assignment, got '{}'", s))
        })?;
        Ok((role.parse()?, model.parse()?))
    }

    /// Resolved assignment for every role
    pub fn resolved(&self) -> Vec<(AgentRole, ModelId)> {
        AgentRole::ALL
            .into_iter()
            .map(|role| (role, self.get(role)))
            .collect()
    }
}

/// Loop limits for one run; fixed once the run starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
}

impl WorkflowConfig {
    pub fn new(max_iterations: u32, convergence_threshold: f64) -> Result<Self, RefineryError> {
        let config = Self {
            max_iterations,
            convergence_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RefineryError> {
        if self.max_iterations < 1 {
            return Err(WorkflowError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&self.convergence_threshold) {
            return Err(WorkflowError::InvalidConfig(format!(
                "convergence_threshold must be within [0, 1], got {}",
                self.convergence_threshold
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
        }
    }
}

/// Provider-side model names and sampling temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub gemini_model: String,
    pub groq_model: String,
    pub openai_model: String,
    pub anthropic_model: String,
    pub temperature: f32,
}

impl ModelSettings {
    pub fn model_name(&self, id: ModelId) -> &str {
        match id {
            ModelId::Gemini => &self.gemini_model,
            ModelId::Groq => &self.groq_model,
            ModelId::OpenAI => &self.openai_model,
            ModelId::Anthropic => &self.anthropic_model,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.5-flash".to_string(),
            groq_model: "openai/gpt-oss-20b".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            anthropic_model: "claude-3-5-haiku-latest".to_string(),
            temperature: 0.9,
        }
    }
}

/// Everything a runner needs besides the topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub workflow: WorkflowConfig,
    pub models: ModelSettings,
    pub distribution: ModelDistribution,
}

impl Settings {
    /// Load settings: file (if given), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, RefineryError> {
        let mut settings = match path {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                Self::from_yaml(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        settings.workflow.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, RefineryError> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Apply `REFINERY_*` and `*_MODEL` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), RefineryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REFINERY_MAX_ITERATIONS") {
            self.workflow.max_iterations = parse_var("REFINERY_MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("REFINERY_CONVERGENCE_THRESHOLD") {
            self.workflow.convergence_threshold = parse_var("REFINERY_CONVERGENCE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("REFINERY_TEMPERATURE") {
            self.models.temperature = parse_var("REFINERY_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.models.gemini_model = v;
        }
        if let Some(v) = lookup("GROQ_MODEL") {
            self.models.groq_model = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.models.openai_model = v;
        }
        if let Some(v) = lookup("ANTHROPIC_MODEL") {
            self.models.anthropic_model = v;
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, RefineryError> {
    value
        .trim()
        .parse()
        .map_err(|_| RefineryError::config(format!("Invalid value for {}: '{}'", key, value)))
}
