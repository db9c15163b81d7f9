use weft_common::WeftError;

use crate::dispatch::NotRunning;

#[derive(Debug, thiserror::Error)]
pub enum WebviewError {
    #[error("owning thread is no longer running")]
    NotRunning,

    /// The native control could not be brought up. Fatal for the webview.
    #[error("native control failed to initialize: {0}")]
    Initialization(String),

    #[error("invalid scheme name: {0:?}")]
    InvalidScheme(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(String),
}

impl From<NotRunning> for WebviewError {
    fn from(_: NotRunning) -> Self {
        WebviewError::NotRunning
    }
}

impl From<WebviewError> for WeftError {
    fn from(err: WebviewError) -> Self {
        match err {
            WebviewError::NotRunning => WeftError::NotRunning,
            WebviewError::Initialization(msg) => WeftError::Initialization(msg),
            WebviewError::Io(e) => WeftError::Io(e),
            other => WeftError::WebView(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_stays_fatal_across_conversion() {
        let err: WeftError = WebviewError::Initialization("no display".into()).into();
        assert!(err.is_fatal());

        let err: WeftError = WebviewError::InvalidScheme("9bad".into()).into();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "webview error: invalid scheme name: \"9bad\"");
    }

    #[test]
    fn not_running_maps_through() {
        let err: WebviewError = NotRunning.into();
        assert!(matches!(err, WebviewError::NotRunning));
        let top: WeftError = err.into();
        assert!(matches!(top, WeftError::NotRunning));
    }
}
