//! End-to-end tests: submit over HTTP, poll until completion or expiry.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use progressor::api::task_routes;
use progressor::queue::{Dispatcher, TaskStore};

fn app(workers: usize) -> (Router, Arc<TaskStore>) {
    let store = TaskStore::new();
    let dispatcher = Arc::new(Dispatcher::start(Arc::clone(&store), workers));
    (task_routes(Arc::clone(&store), dispatcher), store)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Poll GET /tasks until the task with `id` reports `status`, or panic after
/// the deadline.
async fn poll_until_status(app: &Router, id: u64, status: &str, deadline: Duration) -> Value {
    let give_up = tokio::time::Instant::now() + deadline;
    loop {
        let (code, tasks) = get_json(app, "/tasks").await;
        assert_eq!(code, StatusCode::OK);

        if let Some(task) = tasks
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == json!(id))
        {
            if task["status"] == json!(status) {
                return task.clone();
            }
        }

        assert!(
            tokio::time::Instant::now() < give_up,
            "task {id} never reached status {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn submit_and_poll_to_completion() {
    let (app, _store) = app(2);

    let (status, body) =
        post_json(&app, "/tasks", json!({"n": 5, "d": 2.0, "n1": 10.0, "i": 0.0, "ttl": 60.0}))
            .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queue_id"], json!(1));

    let task = poll_until_status(&app, 1, "completed", Duration::from_secs(5)).await;

    assert_eq!(task["n"], json!(5));
    assert_eq!(task["d"], json!(2.0));
    assert_eq!(task["n1"], json!(10.0));
    assert_eq!(task["current_value"], json!(18.0));
    // Display normalization: finished tasks report current_iteration == n.
    assert_eq!(task["current_iteration"], json!(5));
    assert!(task["time_placed"].is_string());
    assert!(task["time_start"].is_string());
    assert!(task["time_end"].is_string());
}

#[tokio::test]
async fn invalid_submission_creates_no_task() {
    let (app, store) = app(1);

    let (status, body) =
        post_json(&app, "/tasks", json!({"n": 0, "d": 1.0, "n1": 0.0, "i": 0.0, "ttl": 1.0}))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'n'"));

    // A pacing interval too large to ever elapse is rejected up front, not
    // accepted and left Running forever.
    let (status, body) =
        post_json(&app, "/tasks", json!({"n": 2, "d": 1.0, "n1": 0.0, "i": 1e30, "ttl": 1.0}))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'i'"));

    assert!(store.is_empty().await);
    let (_, tasks) = get_json(&app, "/tasks").await;
    assert_eq!(tasks, json!([]));
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let (app, store) = app(1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn single_element_task_completes_with_seed_only() {
    let (app, store) = app(1);

    let (status, body) =
        post_json(&app, "/tasks", json!({"n": 1, "d": 9.0, "n1": 4.5, "i": 0.5, "ttl": 60.0}))
            .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["queue_id"].as_u64().unwrap();

    // Completes without waiting out the 0.5s pacing interval: zero steps.
    let task = poll_until_status(&app, id, "completed", Duration::from_millis(400)).await;
    assert_eq!(task["current_value"], json!(4.5));
    assert_eq!(task["current_iteration"], json!(1));

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.results, vec![4.5]);
    assert_eq!(stored.current_iteration, 0);
}

#[tokio::test]
async fn completed_result_expires_after_ttl() {
    let (app, _store) = app(1);

    let (_, body) =
        post_json(&app, "/tasks", json!({"n": 2, "d": 1.0, "n1": 0.0, "i": 0.0, "ttl": 0.1}))
            .await;
    let id = body["queue_id"].as_u64().unwrap();

    let task = poll_until_status(&app, id, "completed", Duration::from_secs(5)).await;
    assert_eq!(task["status"], json!("completed"));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let task = poll_until_status(&app, id, "expired", Duration::from_secs(1)).await;
    // Parameters and results stay visible; only the status changes.
    assert_eq!(task["current_value"], json!(1.0));
    assert_eq!(task["current_iteration"], json!(2));
}

#[tokio::test]
async fn point_lookup_and_health() {
    let (app, _store) = app(1);

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, body) = get_json(&app, "/tasks/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("99"));

    let (_, body) =
        post_json(&app, "/tasks", json!({"n": 3, "d": 1.0, "n1": 0.0, "i": 0.0, "ttl": 60.0}))
            .await;
    let id = body["queue_id"].as_u64().unwrap();

    let (status, task) = get_json(&app, &format!("/tasks/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["id"], json!(id));
}

#[tokio::test]
async fn many_tasks_share_a_small_pool() {
    let (app, _store) = app(2);

    let mut ids = Vec::new();
    for _ in 0..8 {
        let (status, body) =
            post_json(&app, "/tasks", json!({"n": 3, "d": 1.0, "n1": 0.0, "i": 0.02, "ttl": 60.0}))
                .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        ids.push(body["queue_id"].as_u64().unwrap());
    }

    // IDs are sequential and never reused.
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());

    for id in ids {
        poll_until_status(&app, id, "completed", Duration::from_secs(10)).await;
    }
}
