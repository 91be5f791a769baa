use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraylogError>;

#[derive(Debug, Error)]
pub enum GraylogError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every credential encoding was rejected.
    #[error("Graylog {status} {url}")]
    Unauthorized { status: u16, url: String },

    #[error("Graylog {status} {url}")]
    Backend { status: u16, url: String },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("transport task failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl GraylogError {
    /// HTTP status reported by the backend, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GraylogError::Unauthorized { status, .. } | GraylogError::Backend { status, .. } => {
                Some(*status)
            }
            GraylogError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            GraylogError::Unauthorized { url, .. }
            | GraylogError::Backend { url, .. }
            | GraylogError::InvalidResponse { url, .. } => Some(url),
            _ => None,
        }
    }
}
