//! Integration tests for `/api/v1/vitals` and `/api/v1/queue`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;

fn reading(worker_id: &str, heart_rate: f64, temperature: f64, timestamp: &str) -> serde_json::Value {
    json!({
        "workerId": worker_id,
        "heartRate": heart_rate,
        "temperature": temperature,
        "timestamp": timestamp,
    })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_returns_202_with_worker_and_job_id() {
    let app = common::build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": " worker-123 ", "heartRate": 72, "temperature": 36.5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workerId"], "worker-123");
    assert!(json["data"]["jobId"].is_i64());
}

#[tokio::test]
async fn submit_rejects_out_of_range_heart_rate() {
    let app = common::build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": "worker-123", "heartRate": 301, "temperature": 36.5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn submit_rejects_bad_worker_id() {
    let app = common::build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": "no spaces!", "heartRate": 72, "temperature": 36.5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_returns_503_when_queue_is_down() {
    let app = common::build_test_app();
    app.queue.set_unavailable(true);

    let response = post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": "worker-123", "heartRate": 72, "temperature": 36.5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "QUEUE_UNAVAILABLE");
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recent_returns_processed_readings_newest_first() {
    let app = common::build_test_app();
    post_json(
        &app.router,
        "/api/v1/vitals",
        reading("worker-123", 72.0, 36.5, "2024-01-01T12:00:00Z"),
    )
    .await;
    post_json(
        &app.router,
        "/api/v1/vitals",
        reading("worker-123", 75.0, 36.7, "2024-01-01T12:00:01Z"),
    )
    .await;
    assert_eq!(app.worker.drain().await.unwrap(), 2);

    let response = get(&app.router, "/api/v1/vitals/worker-123/recent").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["heartRate"], 75.0);
    assert_eq!(data[1]["heartRate"], 72.0);
    assert!(data[0]["id"].is_string());
    assert_eq!(data[0]["workerId"], "worker-123");
}

#[tokio::test]
async fn recent_for_unknown_worker_is_empty() {
    let app = common::build_test_app();
    let json = body_json(get(&app.router, "/api/v1/vitals/worker-999/recent").await).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn recent_survives_cache_outage() {
    let app = common::build_test_app();
    app.cache_backend.set_failing(true);
    post_json(
        &app.router,
        "/api/v1/vitals",
        reading("worker-123", 72.0, 36.5, "2024-01-01T12:00:00Z"),
    )
    .await;
    app.worker.drain().await.unwrap();

    let response = get(&app.router, "/api/v1/vitals/worker-123/recent").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn range_filters_inclusively() {
    let app = common::build_test_app();
    for (minute, rate) in [(0, 70.0), (1, 71.0), (2, 72.0), (3, 73.0)] {
        post_json(
            &app.router,
            "/api/v1/vitals",
            reading("worker-123", rate, 36.5, &format!("2024-01-01T12:0{minute}:00Z")),
        )
        .await;
    }
    app.worker.drain().await.unwrap();

    let response = get(
        &app.router,
        "/api/v1/vitals/worker-123/range?start=2024-01-01T12:01:00Z&end=2024-01-01T12:02:00Z",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rates: Vec<f64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["heartRate"].as_f64().unwrap())
        .collect();
    assert_eq!(rates, vec![72.0, 71.0]);
}

#[tokio::test]
async fn range_requires_both_bounds() {
    let app = common::build_test_app();
    let response = get(
        &app.router,
        "/api/v1/vitals/worker-123/range?start=2024-01-01T12:01:00Z",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_status_and_stats_track_processing() {
    let app = common::build_test_app();
    let submitted = body_json(
        post_json(
            &app.router,
            "/api/v1/vitals",
            json!({ "workerId": "worker-123", "heartRate": 72, "temperature": 36.5 }),
        )
        .await,
    )
    .await;
    let job_id = submitted["data"]["jobId"].as_i64().unwrap();

    let stats = body_json(get(&app.router, "/api/v1/queue/stats").await).await;
    assert_eq!(stats["data"]["waiting"], 1);

    app.worker.drain().await.unwrap();

    let job = body_json(get(&app.router, &format!("/api/v1/queue/jobs/{job_id}")).await).await;
    assert_eq!(job["data"]["state"], "completed");
    assert_eq!(job["data"]["attemptsMade"], 1);

    let stats = body_json(get(&app.router, "/api/v1/queue/stats").await).await;
    assert_eq!(stats["data"]["completed"], 1);
    assert_eq!(stats["data"]["total"], 1);
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = common::build_test_app();
    let response = get(&app.router, "/api/v1/queue/jobs/12345").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn pause_and_resume_control_processing() {
    let app = common::build_test_app();

    let paused = body_json(post_json(&app.router, "/api/v1/queue/pause", json!({})).await).await;
    assert_eq!(paused["data"]["paused"], true);
    let status = body_json(get(&app.router, "/api/v1/queue/status").await).await;
    assert_eq!(status["data"]["paused"], true);

    let response = post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": "worker-123", "heartRate": 72, "temperature": 36.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(app.worker.drain().await.unwrap(), 0);

    let resumed = body_json(post_json(&app.router, "/api/v1/queue/resume", json!({})).await).await;
    assert_eq!(resumed["data"]["paused"], false);
    assert_eq!(app.worker.drain().await.unwrap(), 1);
}

#[tokio::test]
async fn clean_removes_finished_jobs() {
    let app = common::build_test_app();
    post_json(
        &app.router,
        "/api/v1/vitals",
        json!({ "workerId": "worker-123", "heartRate": 72, "temperature": 36.5 }),
    )
    .await;
    app.worker.drain().await.unwrap();

    let response = post_json(&app.router, "/api/v1/queue/clean", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["removed"], 1);

    let stats = body_json(get(&app.router, "/api/v1/queue/stats").await).await;
    assert_eq!(stats["data"]["total"], 0);
}

#[tokio::test]
async fn pause_returns_503_when_queue_is_down() {
    let app = common::build_test_app();
    app.queue.set_unavailable(true);

    let response = post_json(&app.router, "/api/v1/queue/pause", json!({})).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
