use std::time::Duration;
use thiserror::Error;

/// Uniform error surface for every exchange operation.
///
/// Errors are `Clone` so the same failure can be recorded in aggregation
/// reports and returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Exchange error{}: {message}", format_protocol_context(*.status, .code.as_deref()))]
    Protocol {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

fn format_protocol_context(status: Option<u16>, code: Option<&str>) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!(" (HTTP {}, code {})", status, code),
        (Some(status), None) => format!(" (HTTP {})", status),
        (None, Some(code)) => format!(" (code {})", code),
        (None, None) => String::new(),
    }
}

impl ExchangeError {
    /// Protocol failure carrying only a venue error code and message
    pub fn venue(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            status: None,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn parse(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Parse(format!("{}: {}", context, err))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<crate::core::config::ConfigError> for ExchangeError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
