//! Configuration schema types for Weft.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod bridge;
mod system;
mod webview;

pub use bridge::*;
pub use system::*;
pub use webview::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Weft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct WeftConfig {
    pub webview: WebviewConfig,
    pub bridge: BridgeConfig,
    pub schemes: SchemesConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_webview_section() {
        let config = WeftConfig::default();
        assert_eq!(config.webview.url, None);
        assert_eq!(config.webview.user_agent, None);
        assert!(config.webview.context_menu);
        assert!(config.webview.hardware_acceleration);
        assert!(!config.webview.persistent_cookies);
        assert!(config.webview.browser_flags.is_empty());
        assert_eq!(config.webview.devtools, cfg!(debug_assertions));
    }

    #[test]
    fn default_bridge_section() {
        let config = WeftConfig::default();
        assert_eq!(config.bridge.global, "weft");
        assert_eq!(config.bridge.max_message_size, 10 * 1024 * 1024);
    }

    #[test]
    fn default_schemes_and_logging() {
        let config = WeftConfig::default();
        assert!(config.schemes.register.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: WeftConfig = toml::from_str(
            r#"
[webview]
url = "weft://localhost/index.html"

[schemes]
register = ["app"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.webview.url.as_deref(),
            Some("weft://localhost/index.html")
        );
        assert_eq!(config.schemes.register, vec!["app".to_string()]);
        assert_eq!(config.bridge.global, "weft");
        assert!(config.webview.context_menu);
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: WeftConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }
}
