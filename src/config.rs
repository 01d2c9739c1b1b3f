use thiserror::Error;
use url::Url;

/// Endpoint used when neither `--endpoint` nor `CHAT_ENDPOINT` is set.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/chat";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid chat endpoint {endpoint:?}: {source}")]
    InvalidUrl {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme {0:?} for chat endpoint, expected http or https")]
    UnsupportedScheme(String),
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: Url,
}

impl ChatConfig {
    /// Uses the given endpoint, or [`DEFAULT_ENDPOINT`] when there is none.
    pub fn resolve(endpoint: Option<&str>) -> Result<Self, ConfigError> {
        match endpoint {
            Some(endpoint) => Self::from_endpoint(endpoint),
            None => Ok(Self::default()),
        }
    }

    pub fn from_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim();
        let url = Url::parse(endpoint).map_err(|source| ConfigError::InvalidUrl {
            endpoint: endpoint.to_string(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => Ok(Self { endpoint: url }),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
        }
    }
}
