//! Common test utilities for video-notifier integration tests
//!
//! This module provides:
//! - A [`TestEnvironment`] running mock OAuth, video API and CMS notifier
//!   servers, wired to a real notification pipeline
//! - Request builders and canned payloads

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use video_notifier_api::{
    create_router, AppState, DefaultHealthChecker, MeteredRenewer, NotifierMetrics, ServiceConfig,
};
use video_notifier_core::{
    auth::{CredentialManager, CredentialRenewer, Credentials},
    fetcher::VideoFetcher,
    forwarder::VideoForwarder,
    notification::NotificationHandler,
};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ACCOUNT_ID: &str = "775205503001";
pub const VIDEO_ID: &str = "4020894387001";
pub const DERIVED_ID: &str = "092e01c7-5164-3e34-a0a8-0bd85c8ce903";
pub const OAUTH_AUTH: &str = "Basic Y2xpZW50OnNlY3JldA==";
pub const CMS_AUTH: &str = "Basic dXNlcjpwYXNz";
pub const TOKEN: &str = "fresh-token";
pub const TRANSACTION_ID: &str = "tid_itest00001";

// ============================================================================
// Test Environment
// ============================================================================

/// Mock collaborators plus the service configuration pointing at them
pub struct TestEnvironment {
    pub oauth: MockServer,
    pub video_api: MockServer,
    pub cms_notifier: MockServer,
    pub config: ServiceConfig,
}

impl TestEnvironment {
    pub async fn start() -> Self {
        let oauth = MockServer::start().await;
        let video_api = MockServer::start().await;
        let cms_notifier = MockServer::start().await;

        let mut config = ServiceConfig::default();
        config.upstream.api_url = format!("{}/v1/accounts/", video_api.uri());
        config.upstream.oauth_url = format!("{}/v3/access_token", oauth.uri());
        config.upstream.auth = OAUTH_AUTH.to_string();
        config.upstream.account_id = ACCOUNT_ID.to_string();
        config.downstream.url = cms_notifier.uri();
        config.downstream.auth = Some(CMS_AUTH.to_string());
        config.http.timeout_seconds = 5;

        Self {
            oauth,
            video_api,
            cms_notifier,
            config,
        }
    }

    /// Router wired the way the service binary wires it
    pub fn router(&self) -> Router {
        create_router(self.app_state())
    }

    pub fn app_state(&self) -> AppState {
        self.config.validate().unwrap();

        let http_client = self.config.http_client_config().build_client().unwrap();
        let metrics = NotifierMetrics::new().unwrap();

        let renewer: Arc<dyn CredentialRenewer> = Arc::new(MeteredRenewer::new(
            Arc::new(CredentialManager::new(
                http_client.clone(),
                self.config.oauth_config(),
                Arc::new(Credentials::new()),
            )),
            metrics.clone(),
        ));

        let fetcher = VideoFetcher::new(
            http_client.clone(),
            self.config.fetcher_config(),
            renewer.clone(),
        );
        let forwarder = VideoForwarder::new(http_client, self.config.forwarder_config());

        let handler = Arc::new(NotificationHandler::new(
            ACCOUNT_ID,
            Arc::new(fetcher),
            Arc::new(forwarder),
        ));
        let health = Arc::new(DefaultHealthChecker::new(ACCOUNT_ID).with_credentials(renewer));

        AppState::new(handler, health, metrics)
    }

    /// Token endpoint handing out [`TOKEN`]
    pub async fn mount_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path("/v3/access_token"))
            .and(header("authorization", OAUTH_AUTH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": TOKEN,
                "token_type": "Bearer",
                "expires_in": 300
            })))
            .mount(&self.oauth)
            .await;
    }

    /// Video API rejecting anything not carrying [`TOKEN`]
    pub async fn mount_unauthorized_fallback(&self) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!([
                { "error_code": "UNAUTHORIZED", "message": "Permission denied." }
            ])))
            .with_priority(10)
            .mount(&self.video_api)
            .await;
    }

    pub fn video_path(video_id: &str) -> String {
        format!("/v1/accounts/{ACCOUNT_ID}/videos/{video_id}")
    }

    /// Authorized video lookup answering with `status` and `body`
    pub async fn mount_video(&self, video_id: &str, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(Self::video_path(video_id)))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .with_priority(1)
            .mount(&self.video_api)
            .await;
    }

    /// Requests received by the CMS notifier, parsed as JSON
    pub async fn forwarded_records(&self) -> Vec<Value> {
        self.cms_notifier
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

// ============================================================================
// Payloads and Requests
// ============================================================================

pub fn video_change_event(account_id: &str, video_id: &str) -> Value {
    json!({
        "timestamp": 1423840514446_u64,
        "account_id": account_id,
        "event": "video-change",
        "video": video_id,
        "version": 26
    })
}

pub fn video(video_id: &str) -> Value {
    json!({
        "id": video_id,
        "account_id": ACCOUNT_ID,
        "name": "Ocean waves",
        "state": "ACTIVE",
        "duration": 30016,
        "tags": ["nature", "sea"],
        "custom_fields": {}
    })
}

pub fn notify_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/notify")
        .header("content-type", "application/json")
        .header("x-request-id", TRANSACTION_ID)
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn force_request(video_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/force-notify/{video_id}"))
        .header("x-request-id", TRANSACTION_ID)
        .body(Body::empty())
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
