//! Local HTTP server that records what the client actually sends.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// One multipart field as received.
#[derive(Debug, Clone)]
pub struct CapturedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl CapturedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone)]
pub enum CapturedRequest {
    Multipart { path: String, fields: Vec<CapturedField> },
    Json { path: String, body: Value },
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        match self {
            CapturedRequest::Multipart { path, .. } | CapturedRequest::Json { path, .. } => path,
        }
    }

    pub fn field(&self, name: &str) -> Option<&CapturedField> {
        match self {
            CapturedRequest::Multipart { fields, .. } => fields.iter().find(|f| f.name == name),
            CapturedRequest::Json { .. } => None,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        match self {
            CapturedRequest::Multipart { fields, .. } => {
                fields.iter().map(|f| f.name.clone()).collect()
            }
            CapturedRequest::Json { .. } => Vec::new(),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            CapturedRequest::Json { body, .. } => Some(body),
            CapturedRequest::Multipart { .. } => None,
        }
    }
}

/// Canned reply for a route.
#[derive(Debug, Clone)]
pub struct CannedReply {
    pub status: StatusCode,
    pub body: String,
}

impl CannedReply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct ServerState {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    replies: Arc<Mutex<Vec<(String, CannedReply)>>>,
}

impl ServerState {
    fn reply_for(&self, path: &str) -> Option<CannedReply> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, r)| r.clone())
    }
}

/// Mimics the review service's four routes. By default every transform
/// answers `{"result": "Organized: <pasted or file text>"}` and the review
/// answers with both inputs echoed back.
pub struct TestServer {
    pub base_url: String,
    state: ServerState,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = ServerState {
            captured: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/set_api_keys", post(set_api_keys))
            .route("/transform_submission", post(transform_submission))
            .route("/transform_checklist", post(transform_checklist))
            .route("/run_review", post(run_review))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Overrides the reply of one route.
    pub fn respond(&self, path: &str, reply: CannedReply) {
        self.state
            .replies
            .lock()
            .unwrap()
            .push((path.to_string(), reply));
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.captured.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

async fn read_fields(mut multipart: Multipart) -> Vec<CapturedField> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.push(CapturedField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    fields
}

fn canned(reply: CannedReply) -> Response {
    (
        reply.status,
        [("content-type", "application/json")],
        reply.body,
    )
        .into_response()
}

async fn set_api_keys(State(state): State<ServerState>, Json(body): Json<Value>) -> Response {
    let path = "/set_api_keys";
    state.captured.lock().unwrap().push(CapturedRequest::Json {
        path: path.to_string(),
        body,
    });
    match state.reply_for(path) {
        Some(reply) => canned(reply),
        None => Json(json!({ "status": "API keys updated" })).into_response(),
    }
}

async fn transform(state: ServerState, path: &str, multipart: Multipart) -> Response {
    let fields = read_fields(multipart).await;
    let input = fields
        .iter()
        .find(|f| f.name == "file")
        .or_else(|| fields.iter().find(|f| f.name == "pasted"))
        .map(CapturedField::text)
        .unwrap_or_default();

    state.captured.lock().unwrap().push(CapturedRequest::Multipart {
        path: path.to_string(),
        fields,
    });

    match state.reply_for(path) {
        Some(reply) => canned(reply),
        None => Json(json!({ "result": format!("Organized: {}", input) })).into_response(),
    }
}

async fn transform_submission(State(state): State<ServerState>, multipart: Multipart) -> Response {
    transform(state, "/transform_submission", multipart).await
}

async fn transform_checklist(State(state): State<ServerState>, multipart: Multipart) -> Response {
    transform(state, "/transform_checklist", multipart).await
}

async fn run_review(State(state): State<ServerState>, multipart: Multipart) -> Response {
    let path = "/run_review";
    let fields = read_fields(multipart).await;
    let text_of = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(CapturedField::text)
            .unwrap_or_default()
    };
    let result = format!("Review of [{}] against [{}]", text_of("submission"), text_of("checklist"));

    state.captured.lock().unwrap().push(CapturedRequest::Multipart {
        path: path.to_string(),
        fields,
    });

    match state.reply_for(path) {
        Some(reply) => canned(reply),
        None => Json(json!({ "result": result })).into_response(),
    }
}
