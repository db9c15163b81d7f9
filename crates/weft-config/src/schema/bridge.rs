//! Bridge and scheme configuration types.

use serde::{Deserialize, Serialize};

/// Page-side bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the page global that exposes `call` / `expose`.
    pub global: String,
    /// Inbound messages larger than this many bytes are dropped
    /// (valid range: 1024-67108864).
    pub max_message_size: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            global: "weft".into(),
            max_message_size: 10 * 1024 * 1024,
        }
    }
}

/// Custom schemes declared to the engine before any webview exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct SchemesConfig {
    pub register: Vec<String>,
}
