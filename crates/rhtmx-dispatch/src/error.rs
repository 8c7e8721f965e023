//! Error types
//!
//! Compile-time failures (`PatternError`, `CompileError`) abort startup.
//! `HttpError` is the request-time signal handlers raise to short-circuit a
//! chain with a status code; it travels inside `anyhow::Error` and is
//! recovered with `downcast_ref`.

use axum::http::StatusCode;
use thiserror::Error;

/// Malformed route specifier or path template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Invalid route pattern: \"{path}\". A parameter cannot be followed by another parameter without any characters in between.")]
    AdjacentParams { path: String },

    #[error("Invalid route pattern: \"{path}\". An optional parameter needs to be a full segment.")]
    OptionalNotFullSegment { path: String },

    #[error("Invalid route pattern: \"{path}\". Unbalanced brackets.")]
    UnbalancedBrackets { path: String },

    #[error("Invalid route template \"{pattern}\": {reason}")]
    InvalidTemplate { pattern: String, reason: String },
}

/// Failure while compiling a command list into a router
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Failed to expand filesystem routes mounted at \"{pattern}\"")]
    FsRoutes {
        pattern: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Status signal raised by handlers and middlewares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("HTTP error {status}")]
pub struct HttpError {
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// Status carried by an error, or 500 when it is not an `HttpError`
    pub fn status_of(err: &anyhow::Error) -> StatusCode {
        err.downcast_ref::<HttpError>()
            .map(|e| e.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// HTTP method outside the seven the router dispatches on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_http_error() {
        let err = anyhow::Error::new(HttpError::not_found());
        assert_eq!(HttpError::status_of(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_of_other_error() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(HttpError::status_of(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pattern_error_names_path() {
        let err = PatternError::AdjacentParams {
            path: "[id][bar]".to_string(),
        };
        assert!(err.to_string().contains("\"[id][bar]\""));
    }
}
