use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Top-level error for everything outside the per-call bridge errors.
///
/// `Initialization` is the only fatal kind: a webview cannot be
/// constructed without a live native control. Everything else is
/// recoverable by the caller.
#[derive(Debug, thiserror::Error)]
pub enum WeftError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("native control failed to initialize: {0}")]
    Initialization(String),

    #[error("owning thread is no longer running")]
    NotRunning,

    #[error("webview error: {0}")]
    WebView(String),

    #[error("{0}")]
    Other(String),
}

impl WeftError {
    /// Whether this error means construction cannot proceed at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WeftError::Initialization(_))
    }
}
