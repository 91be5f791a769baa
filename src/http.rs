use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info};

use crate::error::{GraylogError, Result};
use crate::mcp::{process_message, RpcRequest};
use crate::tools::GraylogTools;

pub type Sessions = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>;

#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<GraylogTools>,
    pub sessions: Sessions,
    /// Interval between SSE keep-alive comments. A failed keep-alive write is
    /// how a silently disconnected client gets noticed.
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(tools: Arc<GraylogTools>) -> Self {
        Self {
            tools,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            keep_alive: Duration::from_secs(15),
        }
    }
}

/// Removes its session from the table once the event stream is dropped,
/// i.e. when the client disconnects.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut map) = self.sessions.try_write() {
            map.remove(&self.id);
            debug!(session_id = %self.id, "sse session closed");
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let id = std::mem::take(&mut self.id);
        let sessions = self.sessions.clone();
        handle.spawn(async move {
            sessions.write().await.remove(&id);
            debug!(session_id = %id, "sse session closed");
        });
    }
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn sse_handler(State(state): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = format!("{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));

    // MCP expects a relative URI the client posts messages to.
    let endpoint_url = format!("/message?session_id={session_id}");
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    {
        let mut sessions = state.sessions.write().await;
        sessions.retain(|_, sender| !sender.is_closed());
        sessions.insert(session_id.clone(), tx);
    }
    info!(session_id = %session_id, "sse session opened");

    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };
    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _session = &guard;
        Ok::<_, Infallible>(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive))
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    payload: std::result::Result<Json<RpcRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid request body: {e}") })),
            )
                .into_response()
        }
    };

    let sender = state.sessions.read().await.get(&q.session_id).cloned();
    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let tools = state.tools.clone();
    let sessions = state.sessions.clone();
    let session_id = q.session_id;
    tokio::spawn(async move {
        for msg in process_message(&tools, req).await {
            let Ok(data) = serde_json::to_string(&msg) else { continue };
            if sender.send(Event::default().event("message").data(data)).is_err() {
                debug!(session_id = %session_id, "sse client gone, dropping session");
                sessions.write().await.remove(&session_id);
                break;
            }
        }
    });
    StatusCode::ACCEPTED.into_response()
}

pub fn build_router(tools: Arc<GraylogTools>) -> Router {
    router_with_state(AppState::new(tools))
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

pub async fn serve_http(tools: Arc<GraylogTools>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GraylogError::ConfigError(format!("bind {addr} failed: {e}")))?;
    info!(addr = %addr, "serving MCP over HTTP/SSE");
    axum::serve(listener, build_router(tools)).await?;
    Ok(())
}

/// Serves HTTP/SSE in the background while `foreground` (the stdio session)
/// runs. Returns when the foreground ends, or as soon as the HTTP side fails.
pub async fn serve_alongside<F>(tools: Arc<GraylogTools>, addr: &str, foreground: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let addr = addr.to_string();
    let mut http_task = tokio::spawn(async move { serve_http(tools, &addr).await });
    tokio::pin!(foreground);

    tokio::select! {
        res = &mut foreground => {
            http_task.abort();
            res
        }
        joined = &mut http_task => match joined {
            Ok(Ok(())) => {
                info!("http transport stopped, stdio keeps running");
                foreground.await
            }
            Ok(Err(e)) => {
                error!(error = %e, "http transport failed");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "http transport task aborted");
                Err(GraylogError::Transport(e.to_string()))
            }
        },
    }
}
