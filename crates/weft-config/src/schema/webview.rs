//! Webview preference types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Preferences applied when the native control is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebviewConfig {
    /// Initial URL to load.
    pub url: Option<String>,
    /// Custom user agent string.
    pub user_agent: Option<String>,
    /// Whether dev tools are available (on by default in debug builds).
    pub devtools: bool,
    pub context_menu: bool,
    /// When off, the engine is started with `--disable-gpu`.
    pub hardware_acceleration: bool,
    /// Keep cookies and storage between runs.
    pub persistent_cookies: bool,
    /// Where persistent storage lives. Defaults to `.weft` in the working
    /// directory when `persistent_cookies` is on.
    pub storage_path: Option<PathBuf>,
    /// Extra flags passed to the browser engine.
    pub browser_flags: Vec<String>,
}

impl Default for WebviewConfig {
    fn default() -> Self {
        Self {
            url: None,
            user_agent: None,
            devtools: cfg!(debug_assertions),
            context_menu: true,
            hardware_acceleration: true,
            persistent_cookies: false,
            storage_path: None,
            browser_flags: Vec::new(),
        }
    }
}
