//! Integration tests for the refinement workflow
//!
//! These tests drive the public runner API end-to-end with scripted agents
//! and mock models; no network access is needed.

use async_trait::async_trait;
use futures::StreamExt;
use once_cell::sync::Lazy;
use refinery_rs::adk::agent::{Agent, LLMAgent};
use refinery_rs::adk::error::{ModelError, RefineryError, WorkflowError};
use refinery_rs::adk::model::{Content, GenerationConfig, Model, Part};
use refinery_rs::refinery::agents::{AgentRole, AgentSet};
use refinery_rs::refinery::config::{ModelDistribution, Settings, WorkflowConfig};
use refinery_rs::refinery::tools::QualityScorer;
use refinery_rs::refinery::workflow::nodes::REQUIRED_SECTIONS;
use refinery_rs::refinery::workflow::{
    NodeName, NodeUpdate, ResearchState, WorkflowEngine, WorkflowRunner,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Components
// ============================================================================

/// Agent that replays a script; the last reply repeats once the script runs out
struct ScriptedAgent {
    name: String,
    replies: Vec<Result<String, ()>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    fn new(name: &str, replies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            replies: replies.iter().map(|r| Ok(r.to_string())).collect(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: vec![Err(())],
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: String) -> Result<String, RefineryError> {
        self.prompts.lock().unwrap().push(input);
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = &self.replies[idx.min(self.replies.len() - 1)];
        match reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(ModelError::EmptyResponse(self.name.clone()).into()),
        }
    }
}

/// Mock model that returns predefined responses in order
struct MockModel {
    responses: Vec<String>,
    response_index: AtomicUsize,
}

impl MockModel {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            response_index: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Model for MockModel {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate_content(
        &self,
        _history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, RefineryError> {
        let idx = self.response_index.fetch_add(1, Ordering::SeqCst);
        let text = self
            .responses
            .get(idx)
            .or(self.responses.last())
            .cloned()
            .unwrap_or_default();
        Ok(Content {
            role: "model".to_string(),
            parts: vec![Part::Text(text)],
        })
    }
}

const DRAFT: &str = "Introduction. Tidal turbines convert the motion of seawater into power. \
    Findings show output is predictable months ahead. Conclusion follows.";

static DEFAULT_REPLIES: Lazy<HashMap<AgentRole, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (AgentRole::Researcher, vec![DRAFT]),
        (AgentRole::Reviewer, vec![r#"{"score": 0.5, "issues": [], "suggestions": []}"#]),
        (AgentRole::FactChecker, vec!["verified: predictable output"]),
        (AgentRole::CitationValidator, vec!["No citations present."]),
        (AgentRole::Editor, vec!["Edited draft v1.", "Edited draft v2.", "Edited draft v3."]),
    ])
});

struct Harness {
    agents: HashMap<AgentRole, Arc<ScriptedAgent>>,
}

impl Harness {
    fn new() -> Self {
        Self::with(&[])
    }

    /// Default scripts with some roles replaced
    fn with(overrides: &[(AgentRole, ScriptedAgent)]) -> Self {
        let mut agents: HashMap<AgentRole, Arc<ScriptedAgent>> = DEFAULT_REPLIES
            .iter()
            .map(|(role, replies)| (*role, Arc::new(ScriptedAgent::new(role.as_str(), replies))))
            .collect();
        for (role, agent) in overrides {
            let agent = ScriptedAgent {
                name: agent.name.clone(),
                replies: agent.replies.clone(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            };
            agents.insert(*role, Arc::new(agent));
        }
        Self { agents }
    }

    fn set(&self) -> AgentSet {
        AgentSet::from_fn(|role| self.agents[&role].clone())
    }

    fn runner(&self, max_iterations: u32, threshold: f64) -> WorkflowRunner {
        let config = WorkflowConfig::new(max_iterations, threshold).unwrap();
        WorkflowRunner::with_agents(self.set(), config).unwrap()
    }

    fn calls(&self, role: AgentRole) -> usize {
        self.agents[&role].calls.load(Ordering::SeqCst)
    }
}

fn reviewer(replies: &[&str]) -> (AgentRole, ScriptedAgent) {
    (AgentRole::Reviewer, ScriptedAgent::new("reviewer", replies))
}

async fn collect(runner: &WorkflowRunner, topic: &str) -> Vec<NodeUpdate> {
    runner
        .stream(topic)
        .map(|item| item.expect("node failed"))
        .collect()
        .await
}

// ============================================================================
// Loop and convergence
// ============================================================================

#[tokio::test]
async fn test_single_pass_when_cap_is_one() {
    let harness = Harness::new();
    let state = harness.runner(1, 0.99).run("tidal power").await.unwrap();

    assert_eq!(state.iteration, 1);
    assert_eq!(harness.calls(AgentRole::Editor), 1);
    assert_eq!(harness.calls(AgentRole::Reviewer), 1);
    assert_eq!(state.final_document, "Edited draft v1.");
}

#[tokio::test]
async fn test_high_reviewer_score_finalizes_after_first_pass() {
    let harness = Harness::with(&[reviewer(&[r#"{"score": 0.95}"#])]);
    let state = harness.runner(5, 0.7).run("tidal power").await.unwrap();

    assert_eq!(state.iteration, 1);
    assert_eq!(state.quality_score, 0.95);
    assert_eq!(harness.calls(AgentRole::Editor), 1);
}

#[tokio::test]
async fn test_loops_until_reviewer_score_meets_threshold() {
    let harness = Harness::with(&[reviewer(&[
        r#"{"score": 0.3}"#,
        r#"{"score": 0.6}"#,
        r#"{"score": 0.8}"#,
    ])]);
    let state = harness.runner(5, 0.7).run("tidal power").await.unwrap();

    assert_eq!(state.iteration, 3);
    assert_eq!(state.quality_score, 0.8);
    assert_eq!(state.final_document, "Edited draft v3.");
}

#[tokio::test]
async fn test_iteration_cap_wins_over_unmet_quality() {
    let harness = Harness::with(&[reviewer(&[r#"{"score": 0.1}"#])]);
    let state = harness.runner(2, 0.9).run("tidal power").await.unwrap();

    assert_eq!(state.iteration, 2);
    assert!(state.quality_score < 0.9);
    assert!(!state.final_document.is_empty());
}

#[tokio::test]
async fn test_editor_never_exceeds_cap() {
    for max in 1..=4 {
        let harness = Harness::with(&[reviewer(&["no score at all"])]);
        let state = harness.runner(max, 1.0).run("tidal power").await.unwrap();
        assert!(harness.calls(AgentRole::Editor) <= max as usize);
        assert_eq!(state.iteration, max);
    }
}

#[tokio::test]
async fn test_node_sequence_for_two_passes() {
    let harness = Harness::new();
    let nodes: Vec<NodeName> = collect(&harness.runner(2, 0.9), "tidal power")
        .await
        .into_iter()
        .map(|u| u.node)
        .collect();

    use NodeName::*;
    assert_eq!(
        nodes,
        vec![
            Research, Review, FactCheck, Citation, Editor, Review, FactCheck, Citation, Editor,
            Finalize
        ]
    );
}

// ============================================================================
// State invariants
// ============================================================================

#[tokio::test]
async fn test_messages_only_grow_and_follow_node_order() {
    let harness = Harness::new();
    let runner = harness.runner(2, 0.9);

    let mut state = ResearchState::new("tidal power");
    let mut previous = 0;
    for update in collect(&runner, "tidal power").await {
        state.apply(update.delta);
        assert!(state.agent_messages.len() >= previous);
        previous = state.agent_messages.len();
    }

    let agents: Vec<&str> = state
        .agent_messages
        .iter()
        .map(|m| m.agent.as_str())
        .collect();
    assert_eq!(
        &agents[..5],
        &["researcher", "reviewer", "fact_checker", "citation_validator", "editor"]
    );
    assert_eq!(agents.len(), 9);
}

#[tokio::test]
async fn test_iteration_changes_only_at_editor() {
    let harness = Harness::new();
    let mut iteration = 0;
    for update in collect(&harness.runner(3, 0.9), "tidal power").await {
        match update.node {
            NodeName::Editor => {
                assert_eq!(update.delta.iteration, Some(iteration + 1));
                iteration += 1;
            }
            _ => assert_eq!(update.delta.iteration, None),
        }
    }
    assert_eq!(iteration, 3);
}

#[tokio::test]
async fn test_finalize_copies_research_content() {
    let harness = Harness::new();
    let updates = collect(&harness.runner(1, 0.5), "tidal power").await;

    let last = updates.last().unwrap();
    assert_eq!(last.node, NodeName::Finalize);
    assert!(last.delta.agent_messages.is_empty());

    let state = harness.runner(1, 0.5).run("tidal power").await.unwrap();
    assert_eq!(state.final_document, state.research_content);
}

#[tokio::test]
async fn test_stream_and_run_agree() {
    let runner = Harness::new().runner(2, 0.9);
    let expected = Harness::new().runner(2, 0.9).run("tidal power").await.unwrap();

    let mut streamed = ResearchState::new("tidal power");
    for update in collect(&runner, "tidal power").await {
        streamed.apply(update.delta);
    }
    assert_eq!(streamed, expected);
}

// ============================================================================
// Review scoring
// ============================================================================

#[tokio::test]
async fn test_unparseable_review_falls_back_to_heuristic() {
    let harness = Harness::with(&[reviewer(&["Solid draft. I'd give it a 9/10."])]);
    let state = harness.runner(1, 0.99).run("tidal power").await.unwrap();

    // The only review saw the researcher's draft and no fact-check results yet
    let expected = QualityScorer::evaluate(DRAFT, "", &REQUIRED_SECTIONS).overall;
    assert_eq!(state.quality_score, expected);
    assert_eq!(state.review_feedback, "Solid draft. I'd give it a 9/10.");
}

#[tokio::test]
async fn test_fenced_json_review_is_parsed() {
    let harness = Harness::with(&[reviewer(&["```json\n{\"score\": 0.91}\n```"])]);
    let state = harness.runner(3, 0.9).run("tidal power").await.unwrap();
    assert_eq!(state.quality_score, 0.91);
    assert_eq!(state.iteration, 1);
}

#[tokio::test]
async fn test_editor_prompt_carries_feedback() {
    let harness = Harness::with(&[reviewer(&[r#"{"score": 0.2, "issues": ["no sources"]}"#])]);
    harness.runner(1, 0.9).run("tidal power").await.unwrap();

    let prompts = harness.agents[&AgentRole::Editor].prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Refine: Introduction."));
    assert!(prompts[0].contains("Feedback: {\"score\": 0.2"));
}

// ============================================================================
// Failures and configuration
// ============================================================================

#[tokio::test]
async fn test_agent_failure_returns_partial_state() {
    let harness = Harness::with(&[(AgentRole::Editor, ScriptedAgent::failing("editor"))]);
    let failure = harness
        .runner(2, 0.9)
        .run("tidal power")
        .await
        .unwrap_err();

    assert_eq!(failure.node, NodeName::Editor);
    assert!(failure.state.final_document.is_empty());
    assert_eq!(failure.state.agent_messages.len(), 4);
    assert_eq!(failure.state.research_content, DRAFT);
    assert!(matches!(
        failure.error,
        RefineryError::Model(ModelError::EmptyResponse(_))
    ));
}

#[tokio::test]
async fn test_stream_yields_error_then_ends() {
    let harness = Harness::with(&[(AgentRole::CitationValidator, ScriptedAgent::failing("cv"))]);
    let items: Vec<_> = harness.runner(2, 0.9).stream("tidal power").collect().await;

    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(|i| i.is_ok()));
    let failure = items[3].as_ref().unwrap_err();
    assert_eq!(failure.node, NodeName::Citation);
    assert_eq!(failure.state.agent_messages.len(), 3);
}

#[tokio::test]
async fn test_blank_agent_reply_stops_the_run() {
    let harness = Harness::with(&[(AgentRole::Researcher, ScriptedAgent::new("researcher", &[""]))]);
    let failure = harness
        .runner(1, 0.9)
        .run("tidal power")
        .await
        .unwrap_err();

    assert_eq!(failure.node, NodeName::Research);
    assert!(matches!(
        failure.error,
        RefineryError::Model(ModelError::EmptyResponse(ref name)) if name == "researcher"
    ));
    assert!(failure.state.agent_messages.is_empty());
    assert!(failure.state.final_document.is_empty());
    assert_eq!(harness.calls(AgentRole::Reviewer), 0);
}

#[tokio::test]
async fn test_manual_stepping_after_failure() {
    let harness = Harness::with(&[(AgentRole::Researcher, ScriptedAgent::failing("r"))]);
    let engine = WorkflowEngine::with_agents(harness.set(), &WorkflowConfig::default()).unwrap();
    let mut execution = engine.start("tidal power");

    let err = execution.step().await.unwrap_err();
    assert!(matches!(
        err,
        RefineryError::Workflow(WorkflowError::NodeFailed { ref node, .. }) if node == "research"
    ));
    assert!(execution.is_finished());
    assert!(matches!(
        execution.step().await,
        Err(RefineryError::Workflow(WorkflowError::AlreadyFinished))
    ));
}

#[test]
fn test_invalid_limits_rejected() {
    assert!(WorkflowConfig::new(0, 0.7).is_err());
    assert!(WorkflowConfig::new(3, -0.1).is_err());

    let bad = WorkflowConfig {
        max_iterations: 2,
        convergence_threshold: 1.2,
    };
    let err = WorkflowRunner::with_agents(Harness::new().set(), bad)
        .err()
        .unwrap();
    assert!(err.is_config_error());
}

#[test]
fn test_unknown_model_rejected_before_run() {
    let err = ModelDistribution::from_pairs([("researcher", "gpt-neo")]).unwrap_err();
    assert!(matches!(
        err,
        RefineryError::Model(ModelError::UnknownModel(_))
    ));

    let yaml = "distribution:\n  editor: llama\n";
    assert!(Settings::from_yaml(yaml).is_err());
}

// ============================================================================
// LLM agents over mock models
// ============================================================================

#[tokio::test]
async fn test_workflow_with_llm_agents() {
    let scripts: HashMap<AgentRole, Vec<&str>> = HashMap::from([
        (AgentRole::Researcher, vec![DRAFT]),
        (AgentRole::Reviewer, vec![r#"{"score": 0.75}"#]),
        (AgentRole::FactChecker, vec!["verified"]),
        (AgentRole::CitationValidator, vec!["ok"]),
        (AgentRole::Editor, vec!["Polished draft."]),
    ]);

    let mut llm_agents: HashMap<AgentRole, Arc<LLMAgent>> = HashMap::new();
    for role in AgentRole::ALL {
        let model = Arc::new(MockModel::new(&scripts[&role]));
        let agent = LLMAgent::new(
            role.display_name().to_string(),
            role.description().to_string(),
            role.system_prompt().to_string(),
            model,
        );
        llm_agents.insert(role, Arc::new(agent));
    }

    let set = AgentSet::from_fn(|role| llm_agents[&role].clone());
    let state = WorkflowRunner::with_agents(set, WorkflowConfig::default())
        .unwrap()
        .run("tidal power")
        .await
        .unwrap();

    assert_eq!(state.final_document, "Polished draft.");
    assert_eq!(state.quality_score, 0.75);

    let memory = llm_agents[&AgentRole::Researcher].memory();
    assert_eq!(memory.len(), 1);
    assert!(memory[0].input.starts_with("Research topic: tidal power"));
    assert_eq!(memory[0].output, DRAFT);
}

#[tokio::test]
async fn test_empty_model_reply_fails_the_run() {
    let model = Arc::new(MockModel::new(&[""]));
    let empty: Arc<dyn Agent> = Arc::new(LLMAgent::new(
        "Reviewer".to_string(),
        "Quality Assurance".to_string(),
        AgentRole::Reviewer.system_prompt().to_string(),
        model,
    ));
    let harness = Harness::new();
    let mut set = harness.set();
    set.reviewer = empty;

    let failure = WorkflowRunner::with_agents(set, WorkflowConfig::default())
        .unwrap()
        .run("tidal power")
        .await
        .unwrap_err();
    assert_eq!(failure.node, NodeName::Review);
    assert!(failure.state.review_feedback.is_empty());
}

#[test]
fn test_settings_defaults_match_documented_values() {
    let settings = Settings::default();
    assert_eq!(settings.workflow.max_iterations, 2);
    assert_eq!(settings.workflow.convergence_threshold, 0.7);
    assert_eq!(settings.models.temperature, 0.9);
    assert_eq!(
        settings.distribution.resolved().len(),
        AgentRole::ALL.len()
    );
}
