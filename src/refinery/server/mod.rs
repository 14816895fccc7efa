// SPDX-License-Identifier: MIT

//! HTTP/SSE front end over the workflow runner

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::RefineryError;
use crate::refinery::config::{Settings, WorkflowConfig};
use crate::refinery::workflow::diagram::{self, DiagramFormat};
use crate::refinery::workflow::{RunFailure, WorkflowRunner};

type ApiError = (StatusCode, Json<Value>);

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
}

pub fn router(settings: Settings) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/graph", get(graph))
        .route("/api/research", post(run_research))
        .route("/api/research/stream", post(stream_research))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            settings: Arc::new(settings),
        })
}

pub async fn serve(port: u16, settings: Settings) -> Result<(), RefineryError> {
    let app = router(settings);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct GraphQuery {
    #[serde(default)]
    format: DiagramFormat,
}

async fn graph(Query(query): Query<GraphQuery>) -> Json<Value> {
    Json(json!({
        "format": query.format,
        "diagram": diagram::render(query.format),
    }))
}

#[derive(Debug, Deserialize)]
struct ResearchRequest {
    topic: String,
    #[serde(default)]
    max_iterations: Option<u32>,
    #[serde(default)]
    convergence_threshold: Option<f64>,
    /// role -> model id
    #[serde(default)]
    models: BTreeMap<String, String>,
}

impl ResearchRequest {
    /// Server settings with this request's overrides applied
    fn settings(&self, base: &Settings) -> Result<Settings, RefineryError> {
        if self.topic.trim().is_empty() {
            return Err(RefineryError::config("topic must not be empty"));
        }
        let mut settings = base.clone();
        settings.workflow = WorkflowConfig::new(
            self.max_iterations.unwrap_or(base.workflow.max_iterations),
            self.convergence_threshold
                .unwrap_or(base.workflow.convergence_threshold),
        )?;
        for (role, model) in &self.models {
            settings.distribution.set(role.parse()?, model.parse()?);
        }
        Ok(settings)
    }

    fn runner(&self, base: &Settings) -> Result<WorkflowRunner, ApiError> {
        let settings = self.settings(base).map_err(bad_request)?;
        WorkflowRunner::new(None, &settings).map_err(bad_request)
    }
}

fn bad_request(e: RefineryError) -> ApiError {
    log::warn!("Rejected research request: {}", e);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": e.to_string() })),
    )
}

fn failure_json(failure: &RunFailure) -> Value {
    json!({
        "node": failure.node,
        "error": failure.error.to_string(),
        "state": failure.state,
    })
}

async fn run_research(
    State(app): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<Value>, ApiError> {
    let runner = payload.runner(&app.settings)?;
    log::info!("Starting research run for topic: {}", payload.topic);

    match runner.run(payload.topic.as_str()).await {
        Ok(state) => Ok(Json(json!({ "status": "completed", "state": state }))),
        Err(failure) => {
            log::error!("Research run failed: {}", failure);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "failed", "failure": failure_json(&failure) })),
            ))
        }
    }
}

async fn stream_research(
    State(app): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let runner = payload.runner(&app.settings)?;
    log::info!("Starting streaming research run for topic: {}", payload.topic);

    let stream = runner.stream(payload.topic).map(|item| match item {
        Ok(update) => Event::default().event("update").json_data(&update),
        Err(failure) => {
            log::error!("Streaming research run failed: {}", failure);
            Event::default()
                .event("error")
                .json_data(failure_json(&failure))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinery::agents::AgentRole;
    use crate::refinery::config::ModelId;

    fn request(json: Value) -> ResearchRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_overrides_settings() {
        let req = request(json!({
            "topic": "tidal power",
            "max_iterations": 4,
            "models": { "reviewer": "anthropic" }
        }));
        let settings = req.settings(&Settings::default()).unwrap();
        assert_eq!(settings.workflow.max_iterations, 4);
        assert_eq!(settings.workflow.convergence_threshold, 0.7);
        assert_eq!(
            settings.distribution.get(AgentRole::Reviewer),
            ModelId::Anthropic
        );
        assert_eq!(
            settings.distribution.get(AgentRole::Researcher),
            ModelId::Gemini
        );
    }

    #[test]
    fn test_request_validation() {
        let base = Settings::default();
        assert!(request(json!({ "topic": "  " })).settings(&base).is_err());
        assert!(request(json!({ "topic": "t", "convergence_threshold": 2.0 }))
            .settings(&base)
            .is_err());
        assert!(request(json!({ "topic": "t", "models": { "editor": "bard" } }))
            .settings(&base)
            .is_err());
    }

    #[test]
    fn test_graph_query_defaults_to_mermaid() {
        let q: GraphQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.format, DiagramFormat::Mermaid);
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }
}
