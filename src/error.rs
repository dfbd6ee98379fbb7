//! Error types for media-breakpoints.
//!
//! All errors are strongly typed using thiserror so callers can pattern match
//! on the specific failure instead of parsing messages.

use thiserror::Error;

/// Errors raised while building a breakpoint registry.
///
/// Registration is all-or-nothing: any of these aborts construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate breakpoint alias '{alias}'")]
    DuplicateAlias {
        alias: String,
    },

    #[error("Media query '{query}' is owned by both '{first}' and '{second}'")]
    DuplicateQuery {
        query: String,
        first: String,
        second: String,
    },

    #[error("Breakpoint '{alias}' has an empty media query")]
    EmptyQuery {
        alias: String,
    },
}

/// Errors reported by the platform match primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Invalid media query '{query}': {reason}")]
    InvalidQuery {
        query: String,
        reason: String,
    },

    #[error("Platform unavailable: {message}")]
    Unavailable {
        message: String,
    },
}

/// Errors surfaced by subscription streams.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("Stream disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for media-breakpoints.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl MediaError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Error for a poisoned lock guarding shared state.
    pub(crate) fn poisoned(context: &'static str) -> Self {
        Self::internal(format!("poisoned lock: {context}"))
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is a platform error.
    #[must_use]
    pub const fn is_platform(&self) -> bool {
        matches!(self, Self::Platform(_))
    }

    /// Returns true if this is a stream error.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if waiting again could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Stream(StreamError::Timeout { .. }))
    }
}

/// Result type alias for media-breakpoints operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_duplicate_alias() {
        let err = RegistryError::DuplicateAlias {
            alias: "gt-sm".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("gt-sm"));
        assert!(msg.contains("Duplicate"));
    }

    #[test]
    fn test_registry_error_duplicate_query() {
        let err = RegistryError::DuplicateQuery {
            query: "(min-width: 600px)".to_string(),
            first: "sm".to_string(),
            second: "gt-xs".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("(min-width: 600px)"));
        assert!(msg.contains("sm"));
        assert!(msg.contains("gt-xs"));
    }

    #[test]
    fn test_stream_error_timeout() {
        let err = StreamError::Timeout { duration_ms: 250 };
        assert!(format!("{err}").contains("250ms"));
    }

    #[test]
    fn test_media_error_from_registry() {
        let err: MediaError = RegistryError::DuplicateAlias {
            alias: "md".to_string(),
        }
        .into();
        assert!(err.is_registry());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_media_error_from_platform() {
        let err: MediaError = PlatformError::InvalidQuery {
            query: "(width >".to_string(),
            reason: "unterminated".to_string(),
        }
        .into();
        assert!(err.is_platform());
        assert!(format!("{err}").contains("(width >"));
    }

    #[test]
    fn test_media_error_retryable() {
        let timeout: MediaError = StreamError::Timeout { duration_ms: 10 }.into();
        assert!(timeout.is_stream());
        assert!(timeout.is_retryable());

        let gone: MediaError = StreamError::Disconnected {
            path: "bus".to_string(),
        }
        .into();
        assert!(!gone.is_retryable());
    }

    #[test]
    fn test_media_error_internal() {
        let err = MediaError::poisoned("match_states");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("match_states"));
    }
}
