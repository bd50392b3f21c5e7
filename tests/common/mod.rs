#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use featuredesk::auth::Identity;
use featuredesk::config::AppConfig;
use featuredesk::database::models::{FeatureEntry, Stage};
use featuredesk::database::{EntityStore, MemoryStore};
use featuredesk::permissions::StaticPermissions;
use featuredesk::services::{Notifier, SpaShellRenderer};
use featuredesk::{router, AppState};

pub const XSSI_PREFIX: &str = ")]}'\n";
pub const ADMIN: &str = "admin@example.com";
pub const EDITOR: &str = "editor@example.com";
pub const OWNER: &str = "owner@other.org";
pub const STRANGER: &str = "stranger@other.org";

/// Notifier that remembers which stages asked for provisioning
#[derive(Default)]
pub struct RecordingNotifier {
    pub stage_ids: Mutex<Vec<i64>>,
}

impl Notifier for RecordingNotifier {
    fn notify_provisioning_requested(&self, stage: &Stage) {
        self.stage_ids.lock().unwrap().push(stage.id);
    }
}

/// The full router over an in-memory store, driven without a socket
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Parse an API body, which must start with the XSSI prefix
    pub fn api_json(&self) -> Result<Value> {
        let json = self
            .body
            .strip_prefix(XSSI_PREFIX)
            .context("API body is missing the XSSI prefix")?;
        Ok(serde_json::from_str(json)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn message(&self) -> Result<String> {
        let body = self.api_json()?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::development();
        config.permissions.site_admins = vec![ADMIN.to_string()];
        config.permissions.site_editors = vec![EDITOR.to_string()];
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let permissions = Arc::new(StaticPermissions::new(&config.permissions));
        let state = Arc::new(AppState::new(
            config,
            store.clone(),
            permissions,
            notifier.clone(),
            Arc::new(SpaShellRenderer),
        ));
        Self {
            router: router(state.clone()),
            state,
            store,
            notifier,
        }
    }

    /// Feature 1 owned by OWNER, with an origin trial stage 10
    pub fn with_sample_feature() -> Self {
        let app = Self::new();
        let mut feature = FeatureEntry::new(1, "Sample feature");
        feature.owner_emails = vec![OWNER.to_string()];
        feature.blink_components = vec!["Blink>DOM".to_string()];
        app.store.insert(feature).unwrap();
        app.store.insert(Stage::new(10, 1, 150)).unwrap();
        app
    }

    pub fn session_for(&self, email: &str) -> String {
        self.state.sessions.issue(&Identity::new(email)).unwrap()
    }

    pub fn xsrf_for(&self, email: &str) -> String {
        self.state.tokens.issue(Some(&Identity::new(email))).token
    }

    pub fn feature(&self, id: i64) -> FeatureEntry {
        let store: &dyn EntityStore = self.store.as_ref();
        store.fetch(id).unwrap().unwrap()
    }

    pub fn stage(&self, id: i64) -> Stage {
        let store: &dyn EntityStore = self.store.as_ref();
        store.fetch(id).unwrap().unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec())?,
        })
    }

    pub async fn get(&self, path: &str, email: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(email) = email {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.session_for(email)));
        }
        self.send(builder.body(Body::empty())?).await
    }

    /// JSON request, optionally signed in and carrying an `X-Xsrf-Token` header
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        email: Option<&str>,
        token: Option<&str>,
        body: Value,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(email) = email {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.session_for(email)));
        }
        if let Some(token) = token {
            builder = builder.header("X-Xsrf-Token", token);
        }
        self.send(builder.body(Body::from(body.to_string()))?).await
    }

    /// Form POST signed in through the session cookie
    pub async fn form_post(&self, path: &str, email: &str, form: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, format!("session={}", self.session_for(email)))
            .body(Body::from(form.to_string()))?;
        self.send(request).await
    }
}

/// `{field: {"form_field_name": label, "value": value}}` for one change
pub fn change(label: &str, value: impl Into<Value>) -> Value {
    serde_json::json!({ "form_field_name": label, "value": value.into() })
}
