//! Fake Contentstack platform for end-to-end tests.
//!
//! One axum server plays the token endpoint, the Launch API and the object
//! store. Every request is recorded so tests can assert on exactly what the
//! pipeline sent, and in which order.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use launch_deploy::Config;
use launch_deploy::config::{
    AUTH_URL_VAR, CLIENT_ID_VAR, CLIENT_SECRET_VAR, ENVIRONMENT_UID_VAR, LAUNCH_URL_VAR,
    PROJECT_UID_VAR, REGION_VAR,
};

/// Placeholder replaced by the fake storage URL in signed-URL responses.
pub const STORAGE_URL: &str = "{storage}";

pub const TOKEN_PATH: &str = "/apps-api/apps/token";
pub const SIGNED_URL_PATH: &str = "/projects/upload/signed_url";
pub const STORAGE_PATH: &str = "/storage/bucket/upload";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

/// Canned response for one route.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Canned {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, content_type: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::text(status, "text/plain", "")
    }
}

/// Responses served by the fake platform, one per route.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub token: Canned,
    pub signed_url: Canned,
    pub upload: Canned,
    pub deployment: Canned,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            token: Canned::json(
                200,
                json!({"access_token": "tok-123", "organization_uid": "org-1"}),
            ),
            signed_url: Canned::json(
                200,
                json!({
                    "uploadUrl": STORAGE_URL,
                    "uploadUid": "u-1",
                    "method": "POST",
                    "fields": {"key": "k", "policy": "p"}
                }),
            ),
            upload: Canned::empty(204),
            deployment: Canned::json(201, json!({"uid": "dep-1", "status": "QUEUED"})),
        }
    }
}

impl Behaviour {
    pub fn with_signed_url(mut self, body: Value) -> Self {
        self.signed_url = Canned::json(200, body);
        self
    }
}

struct FakeState {
    base_url: String,
    behaviour: Behaviour,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct FakePlatform {
    pub base_url: String,
    state: Arc<FakeState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakePlatform {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake platform");
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let state = Arc::new(FakeState {
            base_url: base_url.clone(),
            behaviour,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn storage_url(&self) -> String {
        format!("{}{}", self.base_url, STORAGE_PATH)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn request_to(&self, path_prefix: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.path.starts_with(path_prefix))
    }

    /// Environment for a run against this server.
    pub fn env(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            (CLIENT_ID_VAR, "client-id".to_string()),
            (CLIENT_SECRET_VAR, "client-secret".to_string()),
            (PROJECT_UID_VAR, "proj-1".to_string()),
            (ENVIRONMENT_UID_VAR, "env-1".to_string()),
            (REGION_VAR, "AWS_EU".to_string()),
            (AUTH_URL_VAR, self.base_url.clone()),
            (LAUNCH_URL_VAR, self.base_url.clone()),
        ])
    }

    pub fn config(&self, project_dir: &Path) -> Config {
        let env = self.env();
        Config::from_lookup(project_dir, |name| env.get(name).cloned()).expect("valid config")
    }
}

impl Drop for FakePlatform {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    });

    let behaviour = &state.behaviour;
    let canned = if path == TOKEN_PATH && method == Method::POST {
        behaviour.token.clone()
    } else if path == SIGNED_URL_PATH && method == Method::GET {
        let mut canned = behaviour.signed_url.clone();
        canned.body = canned
            .body
            .replace(STORAGE_URL, &format!("{}{}", state.base_url, STORAGE_PATH));
        canned
    } else if path.starts_with("/storage/") {
        behaviour.upload.clone()
    } else if path.ends_with("/deployments") && method == Method::POST {
        behaviour.deployment.clone()
    } else {
        Canned::json(404, json!({"message": "no such route"}))
    };

    let status = StatusCode::from_u16(canned.status).unwrap();
    (status, [(header::CONTENT_TYPE, canned.content_type)], canned.body).into_response()
}

/// Minimal project tree with a few allow-listed files.
pub fn sample_project(root: &Path) {
    std::fs::write(root.join("package.json"), r#"{"name":"site","version":"1.0.0"}"#).unwrap();
    std::fs::create_dir_all(root.join("pages")).unwrap();
    std::fs::write(root.join("pages/index.js"), "export default function Home() {}").unwrap();
    std::fs::create_dir_all(root.join("public")).unwrap();
    std::fs::write(root.join("public/robots.txt"), "User-agent: *").unwrap();
    std::fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
    std::fs::write(root.join("node_modules/left-pad/index.js"), "skip me").unwrap();
}
