//! Turning a loaded config into core types.

use weft_config::WeftConfig;
use weft_webview::{Application, Preferences, WebviewError};

pub fn preferences_from(config: &WeftConfig) -> Preferences {
    let webview = &config.webview;
    Preferences {
        user_agent: webview.user_agent.clone(),
        dev_tools: webview.devtools,
        context_menu: webview.context_menu,
        hardware_acceleration: webview.hardware_acceleration,
        persistent_cookies: webview.persistent_cookies,
        storage_path: webview.storage_path.clone(),
        browser_flags: webview.browser_flags.clone(),
        bridge_global: config.bridge.global.clone(),
        max_message_size: config.bridge.max_message_size as usize,
    }
}

/// An application with every configured scheme declared.
pub fn application_from(config: &WeftConfig) -> Result<Application, WebviewError> {
    let app = Application::new();
    for scheme in &config.schemes.register {
        app.register_scheme(scheme)?;
    }
    Ok(app)
}
