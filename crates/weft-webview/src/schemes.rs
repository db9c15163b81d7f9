//! Custom URI scheme interception.
//!
//! A handler registered for `app` receives every request the engine
//! intercepts for `app:*` URLs and answers with a [`SchemeReply`] or a
//! [`SchemeError`]. Either way the engine gets a well-formed
//! [`SchemeResponse`] back.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};
use weft_common::is_valid_scheme_name;

use crate::engine::NativeEngine;
use crate::error::WebviewError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SchemeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Self::default()
        }
    }

    /// Everything before the first `:`.
    pub fn scheme(&self) -> Option<&str> {
        self.url.split_once(':').map(|(scheme, _)| scheme)
    }

    /// The URL with `scheme:` and any `//` removed.
    pub fn path(&self) -> &str {
        match self.url.split_once(':') {
            Some((_, rest)) => rest.trim_start_matches('/'),
            None => &self.url,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A handler's successful answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeReply {
    pub data: Vec<u8>,
    pub mime: String,
    pub headers: Vec<(String, String)>,
    pub status: u16,
}

impl SchemeReply {
    pub fn new(data: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime: mime.into(),
            headers: Vec::new(),
            status: 200,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SchemeError {
    #[error("not_found")]
    NotFound,
    #[error("invalid")]
    Invalid,
    #[error("denied")]
    Denied,
    #[error("aborted")]
    Aborted,
    #[error("failed")]
    Failed,
}

impl SchemeError {
    pub fn status(self) -> u16 {
        match self {
            SchemeError::NotFound => 404,
            SchemeError::Invalid => 400,
            SchemeError::Denied => 403,
            SchemeError::Aborted => 499,
            SchemeError::Failed => 500,
        }
    }

    /// Symbolic name, used as the response's status text.
    pub fn name(self) -> &'static str {
        match self {
            SchemeError::NotFound => "not_found",
            SchemeError::Invalid => "invalid",
            SchemeError::Denied => "denied",
            SchemeError::Aborted => "aborted",
            SchemeError::Failed => "failed",
        }
    }
}

/// What goes back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl From<SchemeReply> for SchemeResponse {
    fn from(reply: SchemeReply) -> Self {
        let mut headers = Vec::with_capacity(reply.headers.len() + 1);
        headers.push(("Content-Type".to_string(), reply.mime));
        headers.extend(reply.headers);

        Self {
            status: reply.status,
            reason: "OK".to_string(),
            headers,
            body: reply.data,
        }
    }
}

impl From<SchemeError> for SchemeResponse {
    fn from(error: SchemeError) -> Self {
        Self {
            status: error.status(),
            reason: error.name().to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

type Handler = Rc<dyn Fn(&SchemeRequest) -> Result<SchemeReply, SchemeError>>;

fn filter_pattern(name: &str) -> String {
    format!("{name}:*")
}

#[derive(Default)]
pub struct SchemeRegistry {
    handlers: RefCell<HashMap<String, Handler>>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`. The first registration wins: returns
    /// `Ok(false)` and keeps the existing handler if `name` is taken.
    pub fn handle_scheme(
        &self,
        engine: &dyn NativeEngine,
        name: &str,
        handler: impl Fn(&SchemeRequest) -> Result<SchemeReply, SchemeError> + 'static,
    ) -> Result<bool, WebviewError> {
        if !is_valid_scheme_name(name) {
            return Err(WebviewError::InvalidScheme(name.to_string()));
        }
        let name = name.to_ascii_lowercase();

        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&name) {
            debug!(scheme = %name, "scheme already handled, keeping first handler");
            return Ok(false);
        }
        handlers.insert(name.clone(), Rc::new(handler));
        drop(handlers);

        engine.register_scheme_filter(&filter_pattern(&name));
        debug!(scheme = %name, "scheme handler registered");
        Ok(true)
    }

    /// Returns whether a handler was removed.
    pub fn remove_scheme(&self, engine: &dyn NativeEngine, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let removed = self.handlers.borrow_mut().remove(&name).is_some();
        if removed {
            engine.unregister_scheme_filter(&filter_pattern(&name));
            debug!(scheme = %name, "scheme handler removed");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.borrow().contains_key(&name.to_ascii_lowercase())
    }

    /// Answer an intercepted request. `None` means no handler claims it
    /// and the request should continue as normal.
    pub fn respond(&self, request: &SchemeRequest) -> Option<SchemeResponse> {
        // Schemes are case-insensitive.
        let scheme = request.scheme()?.to_ascii_lowercase();
        let handler = self.handlers.borrow().get(&scheme).cloned()?;

        let response = match handler(request) {
            Ok(reply) => SchemeResponse::from(reply),
            Err(error) => {
                warn!(url = %request.url, error = error.name(), "scheme handler failed");
                SchemeResponse::from(error)
            }
        };
        debug!(url = %request.url, status = response.status, "scheme request answered");
        Some(response)
    }

    /// Drop every handler and its filter.
    pub fn clear(&self, engine: &dyn NativeEngine) {
        let names: Vec<String> = self.handlers.borrow_mut().drain().map(|(name, _)| name).collect();
        for name in names {
            engine.unregister_scheme_filter(&filter_pattern(&name));
        }
    }
}
