//! Default TOML config template with inline documentation comments.

use crate::schema::CONFIG_SCHEMA_VERSION;

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    format!(
        r##"# Weft Configuration
# Schema version {CONFIG_SCHEMA_VERSION}
# Only override what you want to change -- missing fields use defaults.

[webview]
# url = "weft://localhost/index.html"
# user_agent = "Weft/0.1"
# devtools = false
# context_menu = true
# hardware_acceleration = true
# persistent_cookies = false
# storage_path = "/path/to/storage"
# browser_flags = []

[bridge]
# global = "weft"              # page global exposing call/expose
# max_message_size = 10485760  # 1024-67108864 bytes

[schemes]
# register = ["app"]           # declared before any webview is created

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    )
}
