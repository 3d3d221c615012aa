#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU16, Ordering},
        Arc, Mutex, Once,
    },
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Router,
};
use goose::{config::GooseConfiguration, goose::GooseUser};
use gumdrop::Options;
use tenksteps_loadgen::{Identities, StepsRun};

pub const RUN: &str = "20240101-00-00-00";

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Goose configuration for tests: no metrics output and no controllers.
pub fn configuration(extra: &[&str]) -> GooseConfiguration {
    let mut args = vec![
        "--quiet",
        "--no-print-metrics",
        "--no-telnet",
        "--no-websocket",
        "--co-mitigation",
        "disabled",
    ];
    args.extend_from_slice(extra);
    GooseConfiguration::parse_args_default(&args).unwrap()
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

struct BackendState {
    requests: Mutex<Vec<Recorded>>,
    register_status: AtomicU16,
    token_status: AtomicU16,
    total_status: AtomicU16,
    token: Mutex<String>,
}

/// In-process stand-in for both the user API and the ingester.
#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        init_tracing();
        let state = Arc::new(BackendState {
            requests: Mutex::new(Vec::new()),
            register_status: AtomicU16::new(200),
            token_status: AtomicU16::new(200),
            total_status: AtomicU16::new(404),
            token: Mutex::new("secret-token".to_string()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A run whose ingester is this backend as well.
    pub fn run(&self) -> StepsRun {
        StepsRun::new(Identities::new(RUN), self.url())
    }

    /// A standalone goose user pointed at this backend.
    pub fn user(&self) -> GooseUser {
        GooseUser::single(self.url().parse().unwrap(), &configuration(&[])).unwrap()
    }

    pub fn set_register_status(&self, status: u16) {
        self.state.register_status.store(status, Ordering::SeqCst);
    }

    pub fn set_total_status(&self, status: u16) {
        self.state.total_status.store(status, Ordering::SeqCst);
    }

    pub fn set_token_response(&self, status: u16, body: &str) {
        self.state.token_status.store(status, Ordering::SeqCst);
        *self.state.token.lock().unwrap() = body.to_string();
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body,
    });

    let status = |code: &AtomicU16| {
        StatusCode::from_u16(code.load(Ordering::SeqCst))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    };
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::POST, ["api", "v1", "register"]) => {
            (status(&state.register_status), String::new())
        }
        (Method::POST, ["api", "v1", "token"]) => (
            status(&state.token_status),
            state.token.lock().unwrap().clone(),
        ),
        (Method::POST, ["ingest"]) => (StatusCode::OK, String::new()),
        (Method::GET, ["api", "v1", _, "total"]) => {
            (status(&state.total_status), String::new())
        }
        (Method::GET, ["api", "v1", _, _, _, _]) => (StatusCode::NOT_FOUND, String::new()),
        (Method::GET, ["api", "v1", user]) => {
            (StatusCode::OK, serde_json::json!({ "username": user }).to_string())
        }
        _ => (StatusCode::NOT_FOUND, String::new()),
    }
}
