use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info_span, warn, Instrument};

use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};
use query::retriever::{build_result, render_text};
use query::{GraphQa, GraphView, QaAnswer, QaError, RetrievalResult};

pub struct AppState {
    pub qa: Arc<GraphQa>,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    graph_store: String,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Deserialize)]
pub struct RetrieveRequest {
    pub entities: Vec<String>,
}

#[derive(Serialize)]
pub struct RetrieveResponse {
    pub text: String,
    pub graph: RetrievalResult,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    stage: &'static str,
}

/// Error surfaced to HTTP clients with the pipeline stage that failed.
pub struct ApiError {
    status: StatusCode,
    stage: &'static str,
    message: String,
}

impl From<QaError> for ApiError {
    fn from(e: QaError) -> Self {
        let status = match e {
            QaError::EmptyQuestion => StatusCode::BAD_REQUEST,
            QaError::Extraction(_) | QaError::Synthesis(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            stage: e.stage(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            stage: self.stage,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .route("/graph", post(graph))
        .route("/retrieve", post(retrieve))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let graph_store = match state.qa.retriever().store().ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse { graph_store })
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QaAnswer>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("ask", %request_id);

    match state.qa.ask(&req.question).instrument(span).await {
        Ok(answer) => {
            state.metrics.record_answer(&answer.trace);
            Ok(Json(answer))
        }
        Err(e) => {
            warn!(%request_id, stage = e.stage(), error = %e, "question failed");
            state.metrics.record_failure();
            Err(e.into())
        }
    }
}

async fn graph(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<GraphView>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let timer = TimedOperation::start();

    let view = state
        .qa
        .graph(&req.question)
        .instrument(info_span!("graph", %request_id))
        .await?;

    state.metrics.record_graph(timer.elapsed(), &view.graph);
    Ok(Json(view))
}

async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RetrieveRequest>,
) -> Json<RetrieveResponse> {
    let timer = TimedOperation::start();
    let retrievals = state.qa.retriever().retrieve_all(&req.entities).await;

    let response = RetrieveResponse {
        text: render_text(&retrievals),
        graph: build_result(&retrievals),
    };
    state.metrics.record_graph(timer.elapsed(), &response.graph);

    Json(response)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
