//! In-process stand-in for the Graylog REST API.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;

use graylog_mcp::client::GraylogClient;
use graylog_mcp::config::GraylogConfig;
use graylog_mcp::tools::GraylogTools;

pub const TOKEN: &str = "secret";
pub const TOKEN_AS_USERNAME: &str = "Basic dG9rZW46c2VjcmV0"; // token:secret
pub const TOKEN_AS_PASSWORD: &str = "Basic c2VjcmV0OnRva2Vu"; // secret:token

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Default)]
struct MockState {
    // replies are consumed in order; the last one repeats
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn client(&self) -> GraylogClient {
        GraylogClient::new(&GraylogConfig::new(self.url(), TOKEN)).unwrap()
    }

    pub fn tools(&self) -> GraylogTools {
        GraylogTools::new(self.client())
    }
}

pub fn json_reply(status: u16, body: Value) -> (u16, String) {
    (status, body.to_string())
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        query,
        headers,
    });
    let (status, body) = {
        let mut replies = state.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or((200, "{}".to_string()))
        }
    };
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

pub async fn spawn_backend(replies: Vec<(u16, String)>) -> MockBackend {
    let state = MockState {
        replies: Arc::new(Mutex::new(replies.into_iter().collect())),
        requests: Arc::default(),
    };
    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockBackend { addr, state }
}
