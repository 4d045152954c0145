//! Integration tests for the push notification endpoint

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, ResponseTemplate,
};

/// Verify a pushed event is fetched with a renewed token, enriched and forwarded
#[tokio::test]
async fn test_video_change_is_forwarded_with_derived_id() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(header("authorization", CMS_AUTH))
        .and(header("x-origin-system-id", "brightcove"))
        .and(header("x-request-id", TRANSACTION_ID))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "id": VIDEO_ID,
            "name": "Ocean waves",
            "derivedID": DERIVED_ID,
            "kind": "video"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&env.cms_notifier)
        .await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        TRANSACTION_ID
    );
    assert_eq!(env.oauth.received_requests().await.unwrap().len(), 1);
}

/// Verify the token obtained once is reused for later notifications
#[tokio::test]
async fn test_token_is_reused_across_notifications() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&env.cms_notifier)
        .await;

    let router = env.router();

    // Act
    for _ in 0..2 {
        let response = send(
            router.clone(),
            notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Assert: one renewal, then the cached token is accepted directly
    assert_eq!(env.oauth.received_requests().await.unwrap().len(), 1);
    assert_eq!(env.video_api.received_requests().await.unwrap().len(), 3);
}

/// Verify events for another account are acknowledged without any upstream call
#[tokio::test]
async fn test_other_account_is_ignored() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event("111111111111", VIDEO_ID)),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(env.video_api.received_requests().await.unwrap().is_empty());
    assert!(env.cms_notifier.received_requests().await.unwrap().is_empty());
}

/// Verify a body that is not an event is acknowledged and dropped
#[tokio::test]
async fn test_malformed_event_is_ignored() {
    // Arrange
    let env = TestEnvironment::start().await;

    for body in [
        json!("not an object"),
        json!({ "account_id": ACCOUNT_ID, "event": "video-change" }),
        video_change_event(ACCOUNT_ID, ""),
        video_change_event(ACCOUNT_ID, "../other"),
    ] {
        // Act
        let response = send(env.router(), notify_request(&body)).await;

        // Assert
        assert_eq!(response.status(), StatusCode::OK, "body: {body}");
    }

    assert!(env.video_api.received_requests().await.unwrap().is_empty());
    assert!(env.cms_notifier.received_requests().await.unwrap().is_empty());
}

/// Verify a transaction ID is generated when the caller sends none
#[tokio::test]
async fn test_transaction_id_is_generated_and_forwarded() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&env.cms_notifier)
        .await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/notify")
        .body(axum::body::Body::from(
            serde_json::to_vec(&video_change_event(ACCOUNT_ID, VIDEO_ID)).unwrap(),
        ))
        .unwrap();

    // Act
    let response = send(env.router(), request).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let echoed = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(echoed.starts_with("tid_"), "{echoed}");

    let forwarded = env.cms_notifier.received_requests().await.unwrap();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(
        forwarded[0].headers.get("x-request-id").unwrap(),
        echoed.as_str()
    );
}

/// Verify a CMS notifier rejection surfaces as a server error
#[tokio::test]
async fn test_downstream_rejection_returns_500() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(VIDEO_ID, 200, video(VIDEO_ID)).await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(400).set_body_string("missing uuid"))
        .expect(1)
        .mount(&env.cms_notifier)
        .await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.is_empty());
}

/// Verify a failing token endpoint stops the pipeline before forwarding
#[tokio::test]
async fn test_token_renewal_failure_returns_500() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_unauthorized_fallback().await;

    Mock::given(method("POST"))
        .and(path("/v3/access_token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&env.oauth)
        .await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(env.video_api.received_requests().await.unwrap().len(), 1);
    assert!(env.cms_notifier.received_requests().await.unwrap().is_empty());
}

/// Verify the lookup is retried only once after renewal
#[tokio::test]
async fn test_still_unauthorized_after_renewal_returns_500() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(env.oauth.received_requests().await.unwrap().len(), 1);
    assert_eq!(env.video_api.received_requests().await.unwrap().len(), 2);
    assert!(env.cms_notifier.received_requests().await.unwrap().is_empty());
}

/// Verify a deleted video pushed by the platform still reaches the CMS notifier
#[tokio::test]
async fn test_deleted_video_is_forwarded_as_not_found() {
    // Arrange
    let env = TestEnvironment::start().await;
    env.mount_token_endpoint().await;
    env.mount_unauthorized_fallback().await;
    env.mount_video(
        VIDEO_ID,
        404,
        json!([{ "error_code": "RESOURCE_NOT_FOUND", "message": "The resource you requested does not exist" }]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&env.cms_notifier)
        .await;

    // Act
    let response = send(
        env.router(),
        notify_request(&video_change_event(ACCOUNT_ID, VIDEO_ID)),
    )
    .await;

    // Assert: the push path acknowledges with 200 either way
    assert_eq!(response.status(), StatusCode::OK);

    let records = env.forwarded_records().await;
    assert_eq!(records[0]["id"], VIDEO_ID);
    assert_eq!(records[0]["error_code"], "RESOURCE_NOT_FOUND");
    assert_eq!(records[0]["derivedID"], DERIVED_ID);
}
