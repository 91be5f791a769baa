//! Maps raw backend records onto [`NormalizedMessage`].
//!
//! Each output field has an ordered list of candidate source names; the first
//! one present with a non-null value wins.

use serde_json::Value;

use crate::model::{NormalizedMessage, RawMessage};

pub const ID_FIELDS: &[&str] = &["_id"];
pub const TS_FIELDS: &[&str] = &["timestamp"];
pub const LEVEL_FIELDS: &[&str] = &["level"];
pub const SOURCE_FIELDS: &[&str] = &["source"];
pub const CONTAINER_FIELDS: &[&str] = &["container", "container_name", "kubernetes.container_name"];
pub const SHORT_MESSAGE_FIELDS: &[&str] = &["short_message"];
pub const MESSAGE_FIELDS: &[&str] = &["message", "full_message", "short_message"];
pub const REQUEST_FIELDS: &[&str] = &["request", "http_request", "req", "request_body"];
pub const RESPONSE_FIELDS: &[&str] = &["response", "http_response", "res", "response_body"];
pub const HTTP_METHOD_FIELDS: &[&str] = &["method", "http_method", "request_method"];
pub const URL_FIELDS: &[&str] = &["url", "path", "request_path"];
pub const STATUS_FIELDS: &[&str] = &["status", "http_status", "response_status"];
pub const LATENCY_FIELDS: &[&str] = &["latency_ms", "duration_ms", "response_time_ms"];
pub const TRACE_ID_FIELDS: &[&str] = &["traceId", "trace_id", "trace.id"];
pub const SPAN_ID_FIELDS: &[&str] = &["spanId", "span_id", "span.id"];
pub const REQUEST_ID_FIELDS: &[&str] = &["request_id", "req_id", "requestId"];
pub const TENANT_ID_FIELDS: &[&str] = &["tenant_id", "tenantId", "tenant"];
pub const CLIENT_IP_FIELDS: &[&str] = &["client_ip", "remote_addr", "ip"];
pub const USER_AGENT_FIELDS: &[&str] = &["user_agent", "agent"];
pub const SERVICE_FIELDS: &[&str] = &["service", "service_name", "app"];

/// Returns the value of the first candidate present in `raw`. JSON `null`
/// counts as missing.
pub fn first_present(raw: &RawMessage, candidates: &[&str]) -> Option<Value> {
    candidates
        .iter()
        .filter_map(|name| raw.get(*name))
        .find(|v| !v.is_null())
        .cloned()
}

pub fn normalize_message(raw: &RawMessage) -> NormalizedMessage {
    let pick = |candidates: &[&str]| first_present(raw, candidates);
    NormalizedMessage {
        id: pick(ID_FIELDS),
        ts: pick(TS_FIELDS),
        level: pick(LEVEL_FIELDS),
        source: pick(SOURCE_FIELDS),
        container: pick(CONTAINER_FIELDS),
        short_message: pick(SHORT_MESSAGE_FIELDS),
        message: pick(MESSAGE_FIELDS),
        request: pick(REQUEST_FIELDS),
        response: pick(RESPONSE_FIELDS),
        http_method: pick(HTTP_METHOD_FIELDS),
        url: pick(URL_FIELDS),
        status: pick(STATUS_FIELDS),
        latency_ms: pick(LATENCY_FIELDS),
        trace_id: pick(TRACE_ID_FIELDS),
        span_id: pick(SPAN_ID_FIELDS),
        request_id: pick(REQUEST_ID_FIELDS),
        tenant_id: pick(TENANT_ID_FIELDS),
        client_ip: pick(CLIENT_IP_FIELDS),
        user_agent: pick(USER_AGENT_FIELDS),
        service: pick(SERVICE_FIELDS),
    }
}

pub fn normalize_messages(raw: &[RawMessage]) -> Vec<NormalizedMessage> {
    raw.iter().map(normalize_message).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawMessage {
        value.as_object().cloned().unwrap()
    }

    // (output field name, candidates) for every normalized field.
    fn all_fields() -> Vec<(&'static str, &'static [&'static str])> {
        vec![
            ("id", ID_FIELDS),
            ("ts", TS_FIELDS),
            ("level", LEVEL_FIELDS),
            ("source", SOURCE_FIELDS),
            ("container", CONTAINER_FIELDS),
            ("short_message", SHORT_MESSAGE_FIELDS),
            ("message", MESSAGE_FIELDS),
            ("request", REQUEST_FIELDS),
            ("response", RESPONSE_FIELDS),
            ("http_method", HTTP_METHOD_FIELDS),
            ("url", URL_FIELDS),
            ("status", STATUS_FIELDS),
            ("latency_ms", LATENCY_FIELDS),
            ("trace_id", TRACE_ID_FIELDS),
            ("span_id", SPAN_ID_FIELDS),
            ("request_id", REQUEST_ID_FIELDS),
            ("tenant_id", TENANT_ID_FIELDS),
            ("client_ip", CLIENT_IP_FIELDS),
            ("user_agent", USER_AGENT_FIELDS),
            ("service", SERVICE_FIELDS),
        ]
    }

    #[test]
    fn empty_record_yields_no_fields() {
        let out = serde_json::to_value(normalize_message(&RawMessage::new())).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn each_candidate_alone_fills_its_field() {
        for (field, candidates) in all_fields() {
            for name in candidates {
                let mut record = RawMessage::new();
                record.insert((*name).to_string(), json!(format!("v-{name}")));
                let out = serde_json::to_value(normalize_message(&record)).unwrap();
                assert_eq!(out[field], json!(format!("v-{name}")), "field {field} from {name}");
            }
        }
    }

    #[test]
    fn unrelated_keys_leave_every_field_absent() {
        let record = raw(json!({"foo": 1, "bar": "x", "kubernetes": {"container_name": "nested"}}));
        let out = serde_json::to_value(normalize_message(&record)).unwrap();
        for (field, _) in all_fields() {
            assert!(out.get(field).is_none(), "{field} should be absent");
        }
    }

    #[test]
    fn first_candidate_wins_when_several_present() {
        for (field, candidates) in all_fields() {
            let mut record = RawMessage::new();
            for name in candidates.iter().rev() {
                record.insert((*name).to_string(), json!(format!("v-{name}")));
            }
            let out = serde_json::to_value(normalize_message(&record)).unwrap();
            assert_eq!(out[field], json!(format!("v-{}", candidates[0])), "field {field}");
        }
    }

    #[test]
    fn null_values_fall_through_to_later_candidates() {
        let record = raw(json!({"traceId": null, "trace_id": "t-2", "container": null}));
        let out = normalize_message(&record);
        assert_eq!(out.trace_id, Some(json!("t-2")));
        assert_eq!(out.container, None);
    }

    #[test]
    fn message_falls_back_to_short_message() {
        let record = raw(json!({"_id": "b", "short_message": "hi"}));
        let out = normalize_message(&record);
        assert_eq!(out.message, Some(json!("hi")));
        assert_eq!(out.short_message, Some(json!("hi")));

        let record = raw(json!({"full_message": "long", "short_message": "hi"}));
        assert_eq!(normalize_message(&record).message, Some(json!("long")));
    }

    #[test]
    fn values_keep_their_json_type() {
        let record = raw(json!({"level": 3, "status": 502, "request": {"a": [1, 2]}}));
        let out = normalize_message(&record);
        assert_eq!(out.level, Some(json!(3)));
        assert_eq!(out.status, Some(json!(502)));
        assert_eq!(out.request, Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn batch_preserves_count_and_order() {
        let records: Vec<RawMessage> = (0..5)
            .map(|i| raw(json!({"_id": format!("id-{i}")})))
            .chain(std::iter::once(RawMessage::new()))
            .collect();
        let out = normalize_messages(&records);
        assert_eq!(out.len(), records.len());
        for (i, msg) in out.iter().take(5).enumerate() {
            assert_eq!(msg.id, Some(json!(format!("id-{i}"))));
        }
        assert_eq!(out[5], NormalizedMessage::default());
    }
}
