//! HTTP boundary — thin axum adapter around the task queue core.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use crate::error::TaskError;
use crate::queue::{Dispatcher, TaskParameters, TaskStore, TaskView};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the router with task submission and query routes.
pub fn task_routes(store: Arc<TaskStore>, dispatcher: Arc<Dispatcher>) -> Router {
    let state = AppState { store, dispatcher };

    Router::new()
        .route("/health", get(health))
        .route("/tasks", post(submit_task).get(list_tasks))
        .route("/tasks/{id}", get(get_task))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "progressor"
    }))
}

/// POST /tasks — validate, admit into the store, hand to the dispatcher.
/// Rejected submissions never create a task.
async fn submit_task(
    State(state): State<AppState>,
    Json(params): Json<TaskParameters>,
) -> impl IntoResponse {
    if let Err(e) = params.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        );
    }

    let id = state.store.add_task(params).await;
    state.dispatcher.submit(id);
    info!(task_id = id, n = params.n, "Task submitted");

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "queue_id": id })),
    )
}

/// GET /tasks — every task ascending by id. Listing is what lazily promotes
/// expired results.
async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let views: Vec<TaskView> = state
        .store
        .list()
        .await
        .iter()
        .map(TaskView::from)
        .collect();

    Json(views)
}

/// GET /tasks/{id} — point lookup, no expiry promotion.
async fn get_task(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    match state.store.get(id).await {
        Some(task) => (StatusCode::OK, Json(serde_json::json!(TaskView::from(&task)))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": TaskError::NotFound { id }.to_string()
            })),
        ),
    }
}
