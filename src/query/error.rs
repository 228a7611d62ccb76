use thiserror::Error;

/// Recognized sub-kinds of backend query errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The expression evaluates to a range vector, which a range query cannot graph.
    RangeVectorResult,
    /// The expression evaluates to a string.
    StringResult,
    Other,
}

impl BackendErrorKind {
    pub fn classify(message: &str) -> Self {
        if message.contains("invalid expression type \"range vector\"") {
            BackendErrorKind::RangeVectorResult
        } else if message.contains("invalid expression type \"string\"") {
            BackendErrorKind::StringResult
        } else {
            BackendErrorKind::Other
        }
    }
}

/// Errors raised at the fetch boundary. Everything downstream of a
/// successful fetch is a pure transform and does not fail recoverably.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Superseded or user-cancelled request
    #[error("Request aborted")]
    Aborted,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend query error: {message}")]
    Backend {
        kind: BackendErrorKind,
        message: String,
    },

    /// Raised by the adaptive sampler when even minimum sampling is above
    /// the hard point ceiling.
    #[error("Dataset too large to graph: {points} points at minimum sampling")]
    VolumeExceeded { points: usize },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl QueryError {
    pub fn backend(message: impl Into<String>) -> Self {
        let message = message.into();
        QueryError::Backend {
            kind: BackendErrorKind::classify(&message),
            message,
        }
    }

    /// Aborts are discarded silently, everything else is shown inline.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, QueryError::Aborted)
    }

    /// Dedicated empty-state text for errors that are not really failures
    /// of the query but of what it returns.
    pub fn empty_state_message(&self) -> Option<&'static str> {
        match self {
            QueryError::Backend {
                kind: BackendErrorKind::RangeVectorResult,
                ..
            } => Some("This query results in a range vector, which cannot be graphed."),
            QueryError::Backend {
                kind: BackendErrorKind::StringResult,
                ..
            } => Some("This query results in a string, which cannot be graphed."),
            QueryError::VolumeExceeded { .. } => {
                Some("Dataset too large to graph. Try a shorter time range or a more specific query.")
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            QueryError::Decode(err.to_string())
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}
