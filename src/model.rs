use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GraylogError, Result};

pub const MAX_LIMIT: u64 = 500;
pub const DEFAULT_BACKEND_LIMIT: u64 = 150;
pub const DEFAULT_UUID_LIMIT: u64 = 200;

/// 后端原始日志记录：字段名随数据源变化，没有固定结构。
pub type RawMessage = Map<String, Value>;

/// Partial view over a backend search payload. Every member is optional and
/// read defensively; a wrapper without a `message` object yields an empty
/// record so the record count is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResult {
    pub total_results: Option<u64>,
    pub messages: Vec<RawMessage>,
}

impl RawSearchResult {
    pub fn from_value(value: &Value) -> Self {
        let total_results = value.get("total_results").and_then(Value::as_u64);
        let messages = value
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        item.get("message")
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            total_results,
            messages,
        }
    }
}

/// A log record reshaped into the stable schema handed to clients.
/// Absent fields are omitted from the JSON, never written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchLogsParams {
    pub query: String,
    #[serde(default = "default_range_sec", rename = "rangeSec", alias = "range_sec")]
    pub range_sec: u64,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl SearchLogsParams {
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(GraylogError::InvalidRequest("query must not be empty".into()));
        }
        validate_range(self.range_sec)?;
        validate_limit(self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchUuidParams {
    pub uuid: String,
    #[serde(default = "default_uuid_range_sec", rename = "rangeSec", alias = "range_sec")]
    pub range_sec: u64,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl SearchUuidParams {
    pub fn validate(&self) -> Result<()> {
        if self.uuid.trim().is_empty() {
            return Err(GraylogError::InvalidRequest("uuid must not be empty".into()));
        }
        validate_range(self.range_sec)?;
        validate_limit(self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchStreamParams {
    #[serde(rename = "streamId", alias = "stream_id")]
    pub stream_id: String,
    #[serde(default = "default_range_sec", rename = "rangeSec", alias = "range_sec")]
    pub range_sec: u64,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl SearchStreamParams {
    pub fn validate(&self) -> Result<()> {
        if self.stream_id.trim().is_empty() {
            return Err(GraylogError::InvalidRequest("streamId must not be empty".into()));
        }
        validate_range(self.range_sec)?;
        validate_limit(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogsResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub messages: Vec<NormalizedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUuidResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub messages: Vec<NormalizedMessage>,
    pub query_used: String,
}

/// Stream endpoint output; the backend reports no total here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessagesResult {
    pub messages: Vec<NormalizedMessage>,
}

fn default_range_sec() -> u64 {
    3600
}

fn default_uuid_range_sec() -> u64 {
    86400
}

fn validate_range(range_sec: u64) -> Result<()> {
    if range_sec == 0 {
        return Err(GraylogError::InvalidRequest("rangeSec must be a positive integer".into()));
    }
    Ok(())
}

fn validate_limit(limit: Option<u64>) -> Result<()> {
    match limit {
        Some(0) => Err(GraylogError::InvalidRequest("limit must be a positive integer".into())),
        Some(n) if n > MAX_LIMIT => Err(GraylogError::InvalidRequest(format!(
            "limit must be <= {MAX_LIMIT}, got {n}"
        ))),
        _ => Ok(()),
    }
}
