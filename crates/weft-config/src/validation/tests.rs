//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = WeftConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_invalid_bridge_global() {
    let mut config = WeftConfig::default();
    config.bridge.global = "my bridge".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bridge.global"));
}

#[test]
fn catches_message_size_out_of_range() {
    let mut config = WeftConfig::default();
    config.bridge.max_message_size = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bridge.max_message_size"));
}

#[test]
fn catches_bad_scheme_names() {
    let mut config = WeftConfig::default();
    config.schemes.register = vec!["app".into(), "9bad".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("9bad"));
    assert!(!err.contains("\"app\""));
}

#[test]
fn catches_empty_url_and_bad_flags() {
    let mut config = WeftConfig::default();
    config.webview.url = Some("  ".into());
    config.webview.browser_flags = vec!["disable-gpu".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("webview.url"));
    assert!(err.contains("webview.browser_flags"));
}

#[test]
fn collects_all_errors() {
    let mut config = WeftConfig::default();
    config.bridge.global = "".into();
    config.bridge.max_message_size = 0;
    config.schemes.register = vec!["a b".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert_eq!(err.matches(';').count(), 2);
}
