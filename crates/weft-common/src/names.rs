//! Name validation shared by config loading and the webview core.

use regex::Regex;
use std::sync::LazyLock;

/// URI scheme grammar from RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").unwrap());

/// A plain (non-unicode) JavaScript identifier.
static JS_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Whether `name` can be used as a custom URI scheme.
pub fn is_valid_scheme_name(name: &str) -> bool {
    SCHEME_RE.is_match(name)
}

/// Whether `name` can be used as a page global.
pub fn is_valid_js_identifier(name: &str) -> bool {
    JS_IDENT_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_schemes() {
        assert!(is_valid_scheme_name("weft"));
        assert!(is_valid_scheme_name("app"));
        assert!(is_valid_scheme_name("my-app.v2+local"));
    }

    #[test]
    fn rejects_malformed_schemes() {
        assert!(!is_valid_scheme_name(""));
        assert!(!is_valid_scheme_name("1app"));
        assert!(!is_valid_scheme_name("app:"));
        assert!(!is_valid_scheme_name("app://"));
        assert!(!is_valid_scheme_name("my app"));
        assert!(!is_valid_scheme_name("app*"));
    }

    #[test]
    fn js_identifiers() {
        assert!(is_valid_js_identifier("weft"));
        assert!(is_valid_js_identifier("_bridge$"));
        assert!(!is_valid_js_identifier("9lives"));
        assert!(!is_valid_js_identifier("a.b"));
        assert!(!is_valid_js_identifier(""));
    }
}
