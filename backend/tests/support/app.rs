//! Router fixtures backed by a fresh in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use race_backend::config::AppConfig;
use race_backend::db::{FullRepository, LocalRepository};
use race_backend::http::{create_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Application wired to a fresh in-memory store, in development mode.
pub struct TestApp {
    pub repo: Arc<LocalRepository>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_testing(TEST_SECRET))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(LocalRepository::new());
        let state = AppState::new(repo.clone() as Arc<dyn FullRepository>, config);
        let router = create_router(state.clone());
        Self {
            repo,
            state,
            router,
        }
    }

    /// POST a JSON body, optionally with a bearer token; returns status and parsed body.
    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Register and log in; returns (user id, token).
    pub async fn login_as(&self, username: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                serde_json::json!({ "username": username, "password": "pw", "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let user_id = body["userId"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "username": username, "password": "pw" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (user_id, body["token"].as_str().unwrap().to_string())
    }

    /// Create a race as `admin_token`; returns its id.
    pub async fn create_race(&self, admin_token: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/raceManagement/create",
                Some(admin_token),
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["raceId"].as_str().unwrap().to_string()
    }
}
