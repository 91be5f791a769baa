use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::GraylogClient;
use crate::error::{GraylogError, Result};
use crate::model::{
    RawSearchResult, SearchLogsParams, SearchLogsResult, SearchStreamParams, SearchUuidParams,
    SearchUuidResult, StreamMessagesResult, DEFAULT_UUID_LIMIT, MAX_LIMIT,
};
use crate::normalize::normalize_messages;

pub const SEARCH_LOGS_TOOL: &str = "search_logs";
pub const SEARCH_UUID_TOOL: &str = "search_uuid";
pub const SEARCH_STREAM_TOOL: &str = "search_stream";

/// Field names services commonly use to carry a correlation id.
pub const CORRELATION_FIELDS: &[&str] = &[
    "request_id",
    "requestId",
    "req_id",
    "trace_id",
    "traceId",
    "trace.id",
    "span_id",
    "spanId",
    "span.id",
    "transaction_id",
    "transactionId",
    "correlation_id",
    "correlationId",
    "_id",
];

/// `request_id:<uuid> OR requestId:<uuid> OR ...` over [`CORRELATION_FIELDS`].
pub fn build_uuid_query(uuid: &str) -> String {
    CORRELATION_FIELDS
        .iter()
        .map(|field| format!("{field}:{uuid}"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// The three log-search tools. Each validates its input before touching the
/// backend.
#[derive(Clone)]
pub struct GraylogTools {
    client: GraylogClient,
}

impl GraylogTools {
    pub fn new(client: GraylogClient) -> Self {
        Self { client }
    }

    pub async fn search_logs(&self, params: SearchLogsParams) -> Result<SearchLogsResult> {
        params.validate()?;
        debug!(query = %params.query, range_sec = params.range_sec, "search_logs");
        let body = self
            .client
            .search_relative(
                &params.query,
                params.range_sec,
                params.limit,
                params.offset,
                params.filter.as_deref(),
            )
            .await?;
        let raw = RawSearchResult::from_value(&body);
        Ok(SearchLogsResult {
            total: raw.total_results,
            messages: normalize_messages(&raw.messages),
        })
    }

    pub async fn search_uuid(&self, params: SearchUuidParams) -> Result<SearchUuidResult> {
        params.validate()?;
        let query = build_uuid_query(&params.uuid);
        debug!(uuid = %params.uuid, range_sec = params.range_sec, "search_uuid");
        let body = self
            .client
            .search_relative(
                &query,
                params.range_sec,
                Some(params.limit.unwrap_or(DEFAULT_UUID_LIMIT)),
                None,
                None,
            )
            .await?;
        let raw = RawSearchResult::from_value(&body);
        Ok(SearchUuidResult {
            total: raw.total_results,
            messages: normalize_messages(&raw.messages),
            query_used: query,
        })
    }

    pub async fn search_stream(&self, params: SearchStreamParams) -> Result<StreamMessagesResult> {
        params.validate()?;
        debug!(stream_id = %params.stream_id, range_sec = params.range_sec, "search_stream");
        let body = self
            .client
            .stream_messages(&params.stream_id, params.range_sec, params.limit)
            .await?;
        let raw = RawSearchResult::from_value(&body);
        Ok(StreamMessagesResult {
            messages: normalize_messages(&raw.messages),
        })
    }

    /// Runs a tool by name and returns its result as pretty-printed JSON.
    pub async fn call(&self, name: &str, args: Value) -> Result<String> {
        let args = if args.is_null() { json!({}) } else { args };
        let text = match canonical_tool_name(name) {
            Some(SEARCH_LOGS_TOOL) => render(&self.search_logs(parse_args(args)?).await?)?,
            Some(SEARCH_UUID_TOOL) => render(&self.search_uuid(parse_args(args)?).await?)?,
            Some(SEARCH_STREAM_TOOL) => render(&self.search_stream(parse_args(args)?).await?)?,
            _ => return Err(GraylogError::InvalidRequest(format!("unknown tool: {name}"))),
        };
        info!(tool = name, bytes = text.len(), "tool call completed");
        Ok(text)
    }
}

/// Accepts both `search_logs` and the older `graylog.search_logs` spelling.
pub fn canonical_tool_name(name: &str) -> Option<&'static str> {
    match name.strip_prefix("graylog.").unwrap_or(name) {
        SEARCH_LOGS_TOOL => Some(SEARCH_LOGS_TOOL),
        SEARCH_UUID_TOOL => Some(SEARCH_UUID_TOOL),
        SEARCH_STREAM_TOOL => Some(SEARCH_STREAM_TOOL),
        _ => None,
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| GraylogError::InvalidRequest(format!("invalid arguments: {e}")))
}

fn render<T: Serialize>(result: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Tool descriptors for `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    let limit = json!({ "type": "integer", "minimum": 1, "maximum": MAX_LIMIT });
    vec![
        json!({
            "name": SEARCH_LOGS_TOOL,
            "description": "Search logs (relative) by query and time window (seconds).",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": { "type": "string", "minLength": 1, "description": "Graylog Lucene/GELF query" },
                    "rangeSec": { "type": "integer", "exclusiveMinimum": 0, "default": 3600 },
                    "limit": limit.clone(),
                    "offset": { "type": "integer", "minimum": 0 },
                    "filter": { "type": "string" }
                }
            }
        }),
        json!({
            "name": SEARCH_UUID_TOOL,
            "description": "Smart search for a UUID across common correlation fields (request_id, trace_id, etc.).",
            "inputSchema": {
                "type": "object",
                "required": ["uuid"],
                "properties": {
                    "uuid": { "type": "string", "minLength": 1, "description": "UUID to search for" },
                    "rangeSec": { "type": "integer", "exclusiveMinimum": 0, "default": 86400 },
                    "limit": limit.clone()
                }
            }
        }),
        json!({
            "name": SEARCH_STREAM_TOOL,
            "description": "Messages for a given streamId for the last N seconds.",
            "inputSchema": {
                "type": "object",
                "required": ["streamId"],
                "properties": {
                    "streamId": { "type": "string", "minLength": 1 },
                    "rangeSec": { "type": "integer", "exclusiveMinimum": 0, "default": 3600 },
                    "limit": limit.clone()
                }
            }
        }),
    ]
}
