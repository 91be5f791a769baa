use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GraylogConfig;
use crate::error::{GraylogError, Result};
use crate::model::DEFAULT_BACKEND_LIMIT;

pub const SEARCH_RELATIVE_PATH: &str = "/api/search/universal/relative";
pub const REQUESTED_BY: &str = "mcp-graylog";

/// Graylog REST client. Holds the immutable connection settings and a shared
/// connection pool; every call is an independent, read-only GET.
#[derive(Clone)]
pub struct GraylogClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl GraylogClient {
    pub fn new(cfg: &GraylogConfig) -> Result<Self> {
        let base_url = cfg.base_url()?;
        let mut builder = Client::builder().danger_accept_invalid_certs(!cfg.ssl_verify);
        if let Some(timeout) = cfg.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| GraylogError::ConfigError(format!("http client: {e}")))?;
        if !cfg.ssl_verify {
            warn!(url = %base_url, "TLS certificate verification disabled");
        }
        Ok(Self {
            http,
            base_url,
            token: cfg.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base URL, keeping any prefix the base carries
    /// (e.g. Graylog served under `/graylog`).
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url.set_query(None);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Basic-Auth candidates, tried in order: `token:<TOKEN>` then `<TOKEN>:token`.
    pub fn auth_candidates(&self) -> [String; 2] {
        let engine = base64::engine::general_purpose::STANDARD;
        [
            engine.encode(format!("token:{}", self.token)),
            engine.encode(format!("{}:token", self.token)),
        ]
    }

    /// Authenticated GET returning the parsed JSON body. A 401 moves on to
    /// the next credential encoding; any other status >= 400 fails at once.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint(path, query);
        let mut last_status: Option<StatusCode> = None;

        for (attempt, auth) in self.auth_candidates().iter().enumerate() {
            let headers = self.headers(auth)?;
            debug!(url = %url, attempt = attempt + 1, "graylog request");
            let resp = self.http.get(url.clone()).headers(headers).send().await?;
            let status = resp.status();
            last_status = Some(status);

            if status == StatusCode::UNAUTHORIZED {
                debug!(url = %url, attempt = attempt + 1, "graylog rejected credentials, trying next encoding");
                continue;
            }
            if status.as_u16() >= 400 {
                warn!(url = %url, status = status.as_u16(), "graylog request failed");
                return Err(GraylogError::Backend {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = resp.bytes().await?;
            return serde_json::from_slice(&body).map_err(|e| GraylogError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            });
        }

        let status = last_status.map(|s| s.as_u16()).unwrap_or(401);
        warn!(url = %url, status, "graylog rejected every credential encoding");
        Err(GraylogError::Unauthorized {
            status,
            url: url.to_string(),
        })
    }

    /// `GET /api/search/universal/relative`
    pub async fn search_relative(
        &self,
        query: &str,
        range_sec: u64,
        limit: Option<u64>,
        offset: Option<u64>,
        filter: Option<&str>,
    ) -> Result<Value> {
        let params = [
            ("query", query.to_string()),
            ("range", range_sec.to_string()),
            ("limit", limit.unwrap_or(DEFAULT_BACKEND_LIMIT).to_string()),
            ("offset", offset.unwrap_or(0).to_string()),
            ("filter", filter.unwrap_or_default().to_string()),
        ];
        self.get_json(SEARCH_RELATIVE_PATH, &params).await
    }

    /// `GET /api/streams/{id}/messages`
    pub async fn stream_messages(&self, stream_id: &str, range_sec: u64, limit: Option<u64>) -> Result<Value> {
        let path = format!("/api/streams/{}/messages", urlencoding::encode(stream_id));
        let params = [
            ("limit", limit.unwrap_or(DEFAULT_BACKEND_LIMIT).to_string()),
            ("range", range_sec.to_string()),
        ];
        self.get_json(&path, &params).await
    }

    fn headers(&self, auth: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Basic {auth}"))
            .map_err(|e| GraylogError::ConfigError(format!("invalid token: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        headers.insert(
            HeaderName::from_static("x-requested-by"),
            HeaderValue::from_static(REQUESTED_BY),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> GraylogClient {
        GraylogClient::new(&GraylogConfig::new(url, "abc")).unwrap()
    }

    #[test]
    fn endpoint_keeps_base_prefix_and_encodes_query() {
        let c = client("https://logs.example.com/graylog/");
        let url = c.endpoint(
            SEARCH_RELATIVE_PATH,
            &[("query", "level:3 AND source:web".into()), ("filter", String::new())],
        );
        assert_eq!(url.path(), "/graylog/api/search/universal/relative");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("query".into(), "level:3 AND source:web".into()));
        assert_eq!(pairs[1], ("filter".into(), String::new()));

        let c = client("http://127.0.0.1:9000");
        assert_eq!(c.endpoint("/api/streams/s/messages", &[]).as_str(), "http://127.0.0.1:9000/api/streams/s/messages");
    }

    #[test]
    fn auth_candidates_try_both_placements() {
        let c = client("https://logs.example.com");
        let [first, second] = c.auth_candidates();
        assert_eq!(first, "dG9rZW46YWJj"); // token:abc
        assert_eq!(second, "YWJjOnRva2Vu"); // abc:token
    }

    #[test]
    fn identifying_header_value() {
        let headers = client("https://logs.example.com").headers("x").unwrap();
        assert_eq!(headers["x-requested-by"], "mcp-graylog");
        assert_eq!(headers[AUTHORIZATION], "Basic x");
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(GraylogClient::new(&GraylogConfig::new("not a url", "abc")).is_err());
    }
}
