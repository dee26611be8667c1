//! REST API server for the intake pipeline and the query subsystem
//!
//! Caller-facing surface: submit-document, poll-task, confirm-commit and
//! ask-question. Rendering, forms and record listings live in a separate
//! frontend that calls these endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::commit::CommitCoordinator;
use crate::models::{PipelineOutput, TaskState};
use crate::rag::QueryAgent;
use crate::tasks::IntakeOrchestrator;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

/// Pending pipeline outputs awaiting confirmation, tracked at the caller
/// layer. A task's output is delivered to the commit coordinator at most
/// once: the first confirm removes it and marks the task confirmed.
#[derive(Default)]
struct PendingResults {
    outputs: HashMap<Uuid, PipelineOutput>,
    confirmed: HashSet<Uuid>,
}

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<IntakeOrchestrator>,
    pub commit: Arc<CommitCoordinator>,
    pub query_agent: Arc<QueryAgent>,
    pending: Arc<Mutex<PendingResults>>,
}

impl ApiState {
    pub fn new(
        orchestrator: Arc<IntakeOrchestrator>,
        commit: Arc<CommitCoordinator>,
        query_agent: Arc<QueryAgent>,
    ) -> Self {
        Self {
            orchestrator,
            commit,
            query_agent,
            pending: Arc::new(Mutex::new(PendingResults::default())),
        }
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Document Intake Endpoints
/// =============================

async fn submit_document(
    State(state): State<ApiState>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No document uploaded.".to_string())),
        );
    }

    let task_id = state.orchestrator.submit(body.to_vec()).await;
    info!(%task_id, "Document accepted for processing");

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "task_id": task_id,
        }))),
    )
}

async fn poll_task(
    State(state): State<ApiState>,
    Path(task_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    let task_state = match state.orchestrator.poll(task_id).await {
        Ok(task_state) => task_state,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(e.to_string())),
            );
        }
    };

    // Stash a successful output so a later confirm does not depend on the
    // orchestrator retaining the task.
    if let TaskState::Success { output } = &task_state {
        let mut pending = state.pending.lock().await;
        if !pending.confirmed.contains(&task_id) {
            pending.outputs.entry(task_id).or_insert_with(|| output.clone());
        }
    }

    (StatusCode::OK, Json(ApiResponse::success(task_state)))
}

async fn confirm_commit(
    State(state): State<ApiState>,
    Path(task_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    // Take the pending output, falling back to a direct poll for callers
    // that confirm without having polled through this instance.
    let output = {
        let mut pending = state.pending.lock().await;

        if pending.confirmed.contains(&task_id) {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "This result was already confirmed.".to_string(),
                )),
            );
        }

        let output = match pending.outputs.remove(&task_id) {
            Some(output) => Some(output),
            None => match state.orchestrator.poll(task_id).await {
                Ok(TaskState::Success { output }) => Some(output),
                _ => None,
            },
        };

        let Some(output) = output else {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "No pending result for this task.".to_string(),
                )),
            );
        };

        // Marked up front so a concurrent confirm for the same task is
        // rejected while this one is in flight.
        pending.confirmed.insert(task_id);
        output
    };

    match state
        .commit
        .commit(&output.record, &output.reconciliation)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "entry_id": receipt.entry_id,
                "message": format!("Ledger entry #{} created!", receipt.entry_id),
                "created_items": receipt.created_items,
            }))),
        ),
        // Operator-facing action: the commit error is surfaced verbatim.
        // A failed commit rolled everything back, so the result is restored
        // for the operator to retry.
        Err(e) => {
            let mut pending = state.pending.lock().await;
            pending.confirmed.remove(&task_id);
            pending.outputs.insert(task_id, output);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

/// =============================
/// Question Endpoint
/// =============================

async fn ask_question(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.question.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No question provided.".to_string())),
        );
    }

    info!(question = %req.question, "Received question");

    let answer = state.query_agent.answer(&req.question).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "answer": answer,
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents", post(submit_document))
        .route("/api/tasks/:task_id", get(poll_task))
        .route("/api/tasks/:task_id/confirm", post(confirm_commit))
        .route("/api/ask", post(ask_question))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MockExtractor;
    use crate::rag::corpus::{ExampleCorpus, IndexedCorpus};
    use crate::rag::embed::MockEmbedder;
    use crate::rag::retriever::ExampleRetriever;
    use crate::rag::synthesize::MockSynthesizer;
    use crate::rag::translate::MockTranslator;
    use crate::risk::MockRiskScorer;
    use crate::store::InMemoryStore;
    use std::time::Duration;

    fn test_state(store: Arc<InMemoryStore>) -> ApiState {
        let orchestrator = Arc::new(IntakeOrchestrator::new(
            Arc::new(MockExtractor::new()),
            Arc::new(MockRiskScorer::new()),
            store.clone() as Arc<dyn crate::store::LedgerStore>,
        ));
        let commit = Arc::new(CommitCoordinator::new(
            store.clone() as Arc<dyn crate::store::LedgerStore>
        ));
        let corpus = Arc::new(IndexedCorpus::unindexed(ExampleCorpus::builtin()));
        let query_agent = Arc::new(QueryAgent::new(
            ExampleRetriever::new(corpus, Arc::new(MockEmbedder)),
            Arc::new(MockTranslator::out_of_domain()),
            Arc::new(MockSynthesizer),
            store as Arc<dyn crate::store::LedgerStore>,
        ));

        ApiState::new(orchestrator, commit, query_agent)
    }

    async fn wait_success(state: &ApiState, task_id: Uuid) {
        for _ in 0..500 {
            if let Ok(task_state) = state.orchestrator.poll(task_id).await {
                if task_state.is_terminal() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task never finished");
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_body() {
        let state = test_state(Arc::new(InMemoryStore::new()));
        let (status, _) = submit_document(State(state), Bytes::new()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_poll_unknown_task_is_404() {
        let state = test_state(Arc::new(InMemoryStore::new()));
        let (status, Json(body)) = poll_task(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_confirm_commits_only_once() {
        let store = Arc::new(InMemoryStore::new());
        let state = test_state(store.clone());

        let (status, Json(body)) = submit_document(
            State(state.clone()),
            Bytes::from_static(b"INVOICE NF-4512"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let task_id: Uuid = serde_json::from_value(
            body.data.unwrap().get("task_id").unwrap().clone(),
        )
        .unwrap();

        wait_success(&state, task_id).await;
        let (status, _) = poll_task(State(state.clone()), Path(task_id)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, Json(body)) = confirm_commit(State(state.clone()), Path(task_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(store.entry_count().await, 1);

        // Second confirmation is rejected; no second entry is created.
        let (status, Json(body)) = confirm_commit(State(state.clone()), Path(task_id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_question() {
        let state = test_state(Arc::new(InMemoryStore::new()));
        let (status, _) = ask_question(
            State(state),
            Json(AskRequest {
                question: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ask_returns_synthesized_answer() {
        let state = test_state(Arc::new(InMemoryStore::new()));
        let (status, Json(body)) = ask_question(
            State(state),
            Json(AskRequest {
                question: "good morning".to_string(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let answer = body.data.unwrap();
        assert!(answer
            .get("answer")
            .and_then(|a| a.as_str())
            .unwrap()
            .contains("does not appear to be a database query"));
    }
}
