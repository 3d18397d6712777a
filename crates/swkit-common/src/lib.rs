//! # SWKit Common
//!
//! Common error types and logging configuration for the SWKit worker
//! runtime crates.
//!
//! ## Features
//!
//! - Unified error type covering caller-facing and internal failures
//! - Logging configuration and setup
//! - Result/Option extension traits

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, LogConfig};

/// Unified error type for SWKit.
#[derive(Error, Debug)]
pub enum SwError {
    /// A required platform capability is unavailable.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Notification permission has not been granted.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Registration-related errors.
    #[error("Registration error: {message}")]
    Registration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cache store errors.
    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network-related errors.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Navigation errors.
    #[error("Navigation error: {message}")]
    Navigation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Worker is in the wrong lifecycle state for the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl SwError {
    /// Create an unsupported-capability error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a registration error.
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a registration error with source.
    pub fn registration_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Registration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a navigation error.
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a navigation error with source.
    pub fn navigation_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Navigation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create an internal error with backtrace.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    /// Check if this error is surfaced to the page controller as-is
    /// (capability and permission failures), as opposed to being
    /// recovered or degraded inside the worker.
    pub fn surfaces_to_caller(&self) -> bool {
        matches!(
            self,
            SwError::Unsupported(_) | SwError::PermissionDenied(_) | SwError::Registration { .. }
        )
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            SwError::Unsupported(_) => "unsupported",
            SwError::PermissionDenied(_) => "permission_denied",
            SwError::Registration { .. } => "registration",
            SwError::Cache { .. } => "cache",
            SwError::Network { .. } => "network",
            SwError::Navigation { .. } => "navigation",
            SwError::InvalidState(_) => "invalid_state",
            SwError::NotFound(_) => "not_found",
            SwError::Io(_) => "io",
            SwError::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for SWKit operations.
pub type Result<T> = std::result::Result<T, SwError>;

/// Extension trait for Result.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| SwError::Internal {
            message: format!("{}: {}", message.into(), e),
            backtrace: Some(backtrace::Backtrace::new()),
        })
    }
}

/// Extension trait for Option.
pub trait OptionExt<T> {
    /// Convert None to a NotFound error.
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SwError::NotFound(resource.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SwError::unsupported("test").category(), "unsupported");
        assert_eq!(SwError::cache("test").category(), "cache");
        assert_eq!(SwError::network("test").category(), "network");
    }

    #[test]
    fn test_surfaces_to_caller() {
        assert!(SwError::unsupported("no Notification API").surfaces_to_caller());
        assert!(SwError::permission_denied("not granted").surfaces_to_caller());
        assert!(!SwError::network("offline").surfaces_to_caller());
        assert!(!SwError::cache("miss").surfaces_to_caller());
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_not_found("test").unwrap(), 42);

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_not_found("test"),
            Err(SwError::NotFound(_))
        ));
    }
}
