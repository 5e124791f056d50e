//! Error types for the relay

use thiserror::Error;

/// Result type alias for the relay
pub type Result<T> = std::result::Result<T, RelayError>;

/// Main error type for the relay.
///
/// Tool failures never show up here: they are absorbed at the tool boundary
/// and turned into a "no data" sentence (see [`ToolFetchError`]).
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid wiring or missing settings, detected at startup or first use
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Too many agent-to-agent transitions in a single run
    #[error("Handoff limit exceeded after {max_hops} hops: {}", chain.join(" -> "))]
    HandoffLimitExceeded { max_hops: usize, chain: Vec<String> },

    /// Too many model calls in a single run
    #[error("Maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// The whole run took longer than the configured soft timeout
    #[error("Run timed out after {secs}s")]
    RunTimeout { secs: u64 },

    /// The model binding failed or produced an unusable completion
    #[error("Model binding error: {message}")]
    ModelBindingError { message: String },

    /// Error from the OpenAI API
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    /// Session store error
    #[error("Session error: {0}")]
    SessionError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Malformed TOML configuration file
    #[error("Config file error: {0}")]
    ConfigFileError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RelayError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub(crate) fn model(message: impl Into<String>) -> Self {
        Self::ModelBindingError {
            message: message.into(),
        }
    }

    /// Whether the error comes from wiring rather than from a single run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError { .. } | Self::ConfigFileError(_)
        )
    }
}

/// Failure inside a tool invoker.
///
/// Never crosses the tool boundary; the invoker logs it and answers with its
/// sentinel string instead.
#[derive(Debug, Error)]
pub enum ToolFetchError {
    /// Connectivity or protocol failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {0}")]
    Status(u16),

    /// The call did not finish within the tool timeout
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The payload did not have the expected shape
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The payload was well formed but held nothing usable
    #[error("no data")]
    NoData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::MaxTurnsExceeded { max_turns: 10 };
        assert_eq!(err.to_string(), "Maximum turns exceeded: 10");

        let err = RelayError::HandoffLimitExceeded {
            max_hops: 2,
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "Handoff limit exceeded after 2 hops: A -> B -> A"
        );
    }

    #[test]
    fn test_error_from_openai() {
        let openai_err = async_openai::error::OpenAIError::InvalidArgument("test".to_string());
        let relay_err: RelayError = openai_err.into();
        assert!(matches!(relay_err, RelayError::OpenAIError(_)));
    }

    #[test]
    fn test_is_configuration() {
        assert!(RelayError::config("dangling handoff").is_configuration());
        assert!(!RelayError::model("empty completion").is_configuration());
        assert!(!RelayError::RunTimeout { secs: 5 }.is_configuration());
    }

    #[test]
    fn test_tool_fetch_error_display() {
        assert_eq!(ToolFetchError::Status(502).to_string(), "upstream returned status 502");
        assert_eq!(ToolFetchError::NoData.to_string(), "no data");
    }
}
