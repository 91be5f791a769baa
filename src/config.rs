use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{GraylogError, Result};

/// 连接 Graylog 所需的参数，进程启动时创建，之后只读。
#[derive(Clone, Serialize, Deserialize)]
pub struct GraylogConfig {
    #[serde(default, alias = "graylog_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    /// Per-request timeout; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GraylogConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            ssl_verify: default_ssl_verify(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Parses the base URL, rejecting anything that is not http(s).
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| GraylogError::ConfigError(format!("invalid graylog url {:?}: {e}", self.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(GraylogError::ConfigError(format!(
                "unsupported url scheme {other:?}, expected http or https"
            ))),
        }
    }
}

impl Default for GraylogConfig {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

// The token never shows up in logs or panics.
impl fmt::Debug for GraylogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraylogConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("ssl_verify", &self.ssl_verify)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Stdio,
    Sse,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,
    pub http_addr: Option<String>,
    pub http_port: Option<u16>,
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Stdio,
            http_addr: None,
            http_port: None,
            debug: false,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.http_addr.as_deref().unwrap_or("127.0.0.1"),
            self.http_port.unwrap_or(3000)
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graylog: GraylogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Values supplied on the command line; any `Some` wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub ssl_verify: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub debug: bool,
    pub mode: Option<ServerMode>,
    pub http_addr: Option<String>,
    pub http_port: Option<u16>,
}

impl Config {
    /// Loads a YAML or JSON config file, chosen by extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GraylogError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let cfg: Config = match ext.as_deref() {
            Some("json") => serde_json::from_str(&raw)?,
            _ => serde_yaml::from_str(&raw)?,
        };
        Ok(cfg)
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.url {
            self.graylog.url = url;
        }
        if let Some(token) = overrides.token {
            self.graylog.token = token;
        }
        if let Some(verify) = overrides.ssl_verify {
            self.graylog.ssl_verify = verify;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.graylog.timeout_secs = secs;
        }
        if let Some(mode) = overrides.mode {
            self.server.mode = mode;
        }
        if overrides.http_addr.is_some() {
            self.server.http_addr = overrides.http_addr;
        }
        if overrides.http_port.is_some() {
            self.server.http_port = overrides.http_port;
        }
        self.server.debug |= overrides.debug;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.graylog.url.trim().is_empty() {
            return Err(GraylogError::ConfigError("graylog url is required".into()));
        }
        self.graylog.base_url()?;
        if self.graylog.token.trim().is_empty() {
            return Err(GraylogError::ConfigError("graylog token is required".into()));
        }
        Ok(())
    }
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}
