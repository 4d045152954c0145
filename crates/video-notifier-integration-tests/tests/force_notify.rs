//! Integration tests for the forced notification endpoint

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

async fn accept_notifications(env: &TestEnvironment) {
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&env.cms_notifier)
        .await;
}

/// Verify an existing video is re-sent and answered with 200
#[tokio::test]
async fn test_force_existing_video_returns_200() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let records = env.forwarded_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["derivedID"], DERIVED_ID);
    assert_eq!(records[0]["kind"], "video");
    assert_eq!(records[0]["tags"], json!(["nature", "sea"]));
}

/// Verify a missing video is forwarded as a not-found marker and answered with 204
#[tokio::test]
async fn test_force_missing_video_returns_204() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(
        "4492075574001",
        404,
        json!([{ "error_code": "RESOURCE_NOT_FOUND", "message": "The resource you requested does not exist" }]),
    )
    .await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request("4492075574001")).await;

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let records = env.forwarded_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "4492075574001");
    assert_eq!(records[0]["error_code"], "RESOURCE_NOT_FOUND");
    assert_eq!(records[0]["derivedID"], "7b66ffd7-d223-31db-af6f-e91a393f04d1");
    assert_eq!(records[0]["kind"], "video");
}

/// Verify a 404 without an error code is still recognised as not found
#[tokio::test]
async fn test_force_not_found_without_error_code() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 404, json!([{ "message": "gone" }]))
        .await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let records = env.forwarded_records().await;
    assert_eq!(records[0]["error_code"], "NOT_FOUND");
    assert_eq!(records[0]["id"], VIDEO_ID);
}

/// Verify an empty 404 body is a fetch failure, not a not-found marker
#[tokio::test]
async fn test_force_empty_not_found_returns_500() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 404, json!([])).await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(env.forwarded_records().await.is_empty());
}

/// Verify the platform's rate limit is passed through to the operator
#[tokio::test]
async fn test_force_rate_limited_returns_429() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(
        VIDEO_ID,
        429,
        json!([{ "error_code": "TOO_MANY_REQUESTS" }]),
    )
    .await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(env.forwarded_records().await.is_empty());
}

/// Verify an unexpected upstream status is a server error
#[tokio::test]
async fn test_force_upstream_failure_returns_500() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 503, json!({})).await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(env.forwarded_records().await.is_empty());
}

/// Verify a video without an id cannot be enriched
#[tokio::test]
async fn test_force_video_without_id_returns_400() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, json!({ "name": "no id" })).await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(env.forwarded_records().await.is_empty());
}

/// Verify an unusable path segment is rejected before any upstream call
#[tokio::test]
async fn test_force_invalid_video_id_returns_400() {
    // Arrange
    let env = TestEnvironment::start().await;

    // Act
    let response = send(env.router(), force_request("bad%20id")).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(env.video_api.received_requests().await.unwrap().is_empty());
}

/// Verify optional downstream headers are sent when configured
#[tokio::test]
async fn test_force_sends_configured_host_header() {
    // Arrange
    let mut env = TestEnvironment::start().await;
    env.config.downstream.host_header = Some("cms-notifier".to_string());
    env.config.downstream.origin_system_id = "http://cmdb.example.com/systems/brightcove".to_string();
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(header("host", "cms-notifier"))
        .and(header(
            "x-origin-system-id",
            "http://cmdb.example.com/systems/brightcove",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&env.cms_notifier)
        .await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
}

/// Verify unset downstream authorization is not sent at all
#[tokio::test]
async fn test_force_without_downstream_auth_omits_header() {
    // Arrange
    let mut env = TestEnvironment::start().await;
    env.config.downstream.auth = None;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;
    accept_notifications(&env).await;

    // Act
    let response = send(env.router(), force_request(VIDEO_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let forwarded = env.cms_notifier.received_requests().await.unwrap();
    assert!(forwarded[0].headers.get("authorization").is_none());
}
