#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use cro_analyzer::{
    AppState,
    config::Config,
    error::{AppError, Result},
    llm::CompletionProvider,
    prompt::SchemaVariant,
};
use tokio::net::TcpListener;

pub const LANDING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Acme Analytics</title></head>
<body>
  <header><a href="/">Acme</a></header>
  <nav><a href="/pricing">Pricing</a><a href="/docs">Docs</a></nav>
  <section class="hero">
    <h1>Know your funnel</h1>
    <p>Dashboards your whole team understands.</p>
    <a class="cta" href="/signup">Start free trial</a>
  </section>
</body>
</html>"#;

pub const BLANK_HTML: &str = "<html><body><p>Coming soon</p><span>stay tuned</span></body></html>";

/// Completion provider returning a canned reply and recording what it was asked.
pub struct FakeCompletion {
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeCompletion {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(FakeCompletion {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(FakeCompletion {
            reply: Err(message.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone().map_err(AppError::CompletionCall)
    }
}

/// In-process origin site; counts every request it serves.
pub struct Origin {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl Origin {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn landing(State(hits): State<Arc<AtomicUsize>>) -> Html<&'static str> {
    hits.fetch_add(1, Ordering::SeqCst);
    Html(LANDING_HTML)
}

async fn blank(State(hits): State<Arc<AtomicUsize>>) -> Html<&'static str> {
    hits.fetch_add(1, Ordering::SeqCst);
    Html(BLANK_HTML)
}

async fn missing(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], "not here")
}

async fn untyped(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let mut response = "<p>raw</p>".into_response();
    response.headers_mut().remove(header::CONTENT_TYPE);
    response
}

pub async fn spawn_origin() -> Origin {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/landing", get(landing))
        .route("/blank", get(blank))
        .route("/missing", get(missing))
        .route("/untyped", get(untyped))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Origin { addr, hits }
}

pub fn test_state(schema: SchemaVariant, completion: Arc<FakeCompletion>) -> AppState {
    let mut config = Config::new("sk-test");
    config.schema = schema;
    AppState::new(config, completion).expect("Failed to build app state")
}

pub fn analyze_request(url: Option<&str>) -> Request<Body> {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    if let Some(url) = url {
        form.append_pair("url", url);
    }
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.finish()))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
