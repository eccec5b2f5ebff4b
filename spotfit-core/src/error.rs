//! Error handling for the spotfit host and its plugins

use thiserror::Error;

/// Result type alias for spotfit operations
pub type Result<T> = std::result::Result<T, SpotfitError>;

/// Main error type for the spotfit system
#[derive(Error, Debug)]
pub enum SpotfitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin-related errors
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Analysis window construction or presentation errors
    #[error("Window error: {0}")]
    Window(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Error: {0}")]
    Generic(String),
}

impl SpotfitError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new plugin error
    pub fn plugin<S: Into<String>>(msg: S) -> Self {
        Self::Plugin(msg.into())
    }

    /// Create a new window error
    pub fn window<S: Into<String>>(msg: S) -> Self {
        Self::Window(msg.into())
    }

    /// Create a generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Self::Generic(msg.into())
    }

    /// Check if this is a recoverable error
    ///
    /// Window failures are not: the host is expected to surface them to the
    /// user rather than retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SpotfitError::Config(_) => false,
            SpotfitError::Plugin(_) => true,
            SpotfitError::Window(_) => false,
            SpotfitError::Io(_) => true,
            SpotfitError::Json(_) => false,
            SpotfitError::Generic(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SpotfitError::Config(_) => ErrorSeverity::High,
            SpotfitError::Plugin(_) => ErrorSeverity::Medium,
            SpotfitError::Window(_) => ErrorSeverity::Critical,
            SpotfitError::Io(_) => ErrorSeverity::Medium,
            SpotfitError::Json(_) => ErrorSeverity::Low,
            SpotfitError::Generic(_) => ErrorSeverity::Low,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
