//! Full configuration validation.
//!
//! Validates numeric ranges and name formats, collecting every problem
//! into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::WeftConfig;
use weft_common::{is_valid_js_identifier, is_valid_scheme_name, ConfigError};

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &WeftConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_webview(&mut errors, config);
    validate_bridge(&mut errors, config);
    validate_schemes(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_webview(errors: &mut Vec<String>, config: &WeftConfig) {
    if let Some(url) = &config.webview.url {
        if url.trim().is_empty() {
            errors.push("webview.url must not be empty".into());
        }
    }
    for flag in &config.webview.browser_flags {
        if !flag.starts_with("--") {
            errors.push(format!("webview.browser_flags entry {flag:?} must start with --"));
        }
    }
}

fn validate_bridge(errors: &mut Vec<String>, config: &WeftConfig) {
    if !is_valid_js_identifier(&config.bridge.global) {
        errors.push(format!(
            "bridge.global = {:?} is not a valid JavaScript identifier",
            config.bridge.global
        ));
    }
    validate_range(
        errors,
        "bridge.max_message_size",
        config.bridge.max_message_size,
        1024,
        64 * 1024 * 1024,
    );
}

fn validate_schemes(errors: &mut Vec<String>, config: &WeftConfig) {
    for name in &config.schemes.register {
        if !is_valid_scheme_name(name) {
            errors.push(format!("schemes.register entry {name:?} is not a valid scheme name"));
        }
    }
}
