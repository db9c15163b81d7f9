//! [`NativeEngine`] backed by `wry`.
//!
//! wry fixes its handlers and custom protocols when the control is built,
//! so scheme filters can only cover what was declared on the
//! [`Application`](crate::Application), and scripts added after creation are
//! replayed right before each dom-ready. wry reports no favicons. A
//! declared scheme has no native fallback, so requests no handler claims
//! are answered with 404.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use weft_common::IdSequence;
use wry::raw_window_handle::HasWindowHandle;
use wry::{PageLoadEvent, WebContext, WebView, WebViewBuilder};

use super::{Edge, EngineHooks, EngineSetup, NativeEngine, ScriptHandle};
use crate::bridge::runtime::{receive_call, runtime_script};
use crate::error::WebviewError;
use crate::events::WebEvent;
use crate::schemes::{SchemeError, SchemeRequest, SchemeResponse};

const CONTEXT_MENU_GUARD: &str = r#"document.addEventListener("contextmenu", function (e) {
  if (window.__weft_context_menu === false) e.preventDefault();
}, true);"#;

/// Window operations the page can start through the bridge.
pub trait WindowControl {
    fn drag(&self);
    fn resize(&self, edge: Edge);
}

type Subscriptions = Arc<Mutex<HashSet<WebEvent>>>;

pub struct WryEngine {
    webview: WebView,
    window: Box<dyn WindowControl>,
    global: String,
    declared: Vec<String>,
    before_load: RefCell<BTreeMap<u64, String>>,
    script_ids: IdSequence,
    subscriptions: Subscriptions,
    title: Arc<Mutex<String>>,
    dev_tools: Cell<bool>,
    context_menu: Cell<bool>,
    _context: Option<WebContext>,
}

impl WryEngine {
    /// Build a webview filling `window` and load `url`.
    pub fn build<W: HasWindowHandle>(
        setup: EngineSetup,
        window: &W,
        control: impl WindowControl + 'static,
        url: &str,
    ) -> Result<WryEngine, WebviewError> {
        let EngineSetup {
            hooks,
            schemes,
            preferences,
        } = setup;

        let subscriptions: Subscriptions = Arc::new(Mutex::new(HashSet::new()));
        let title = Arc::new(Mutex::new(String::new()));
        let mut context = preferences
            .effective_storage_path()
            .map(|path| WebContext::new(Some(path)));

        let mut builder = match context.as_mut() {
            Some(context) => WebViewBuilder::with_web_context(context),
            None => WebViewBuilder::new(),
        };

        builder = builder
            .with_url(url)
            .with_devtools(preferences.dev_tools)
            .with_incognito(!preferences.persistent_cookies)
            .with_initialization_script(&runtime_script(&preferences.bridge_global))
            .with_initialization_script(&format!(
                "window.__weft_context_menu = {};",
                preferences.context_menu
            ))
            .with_initialization_script(CONTEXT_MENU_GUARD);

        if let Some(agent) = &preferences.user_agent {
            builder = builder.with_user_agent(agent);
        }

        #[cfg(target_os = "windows")]
        {
            use wry::WebViewBuilderExtWindows;
            let flags = preferences.effective_flags();
            if !flags.is_empty() {
                builder = builder.with_additional_browser_args(&flags.join(" "));
            }
        }
        #[cfg(not(target_os = "windows"))]
        if !preferences.effective_flags().is_empty() {
            debug!("browser flags are only applied on Windows");
        }

        builder = attach_handlers(builder, &hooks, &subscriptions, &title);
        for scheme in &schemes {
            let hooks = hooks.clone();
            builder = builder.with_custom_protocol(scheme.clone(), move |_id, request| {
                respond(&hooks, request)
            });
        }

        let webview = builder
            .build(window)
            .map_err(|err| WebviewError::Initialization(err.to_string()))?;

        debug!(url, schemes = schemes.len(), "wry webview built");
        Ok(WryEngine {
            webview,
            window: Box::new(control),
            global: preferences.bridge_global.clone(),
            declared: schemes,
            before_load: RefCell::new(BTreeMap::new()),
            script_ids: IdSequence::new(),
            subscriptions,
            title,
            dev_tools: Cell::new(preferences.dev_tools),
            context_menu: Cell::new(preferences.context_menu),
            _context: context,
        })
    }

    pub fn webview(&self) -> &WebView {
        &self.webview
    }

    fn evaluate(&self, code: &str) {
        if let Err(err) = self.webview.evaluate_script(code) {
            warn!(error = %err, "script evaluation failed");
        }
    }
}

fn is_subscribed(subscriptions: &Subscriptions, event: WebEvent) -> bool {
    subscriptions
        .lock()
        .map(|set| set.contains(&event))
        .unwrap_or(false)
}

fn attach_handlers<'a>(
    builder: WebViewBuilder<'a>,
    hooks: &EngineHooks,
    subscriptions: &Subscriptions,
    title: &Arc<Mutex<String>>,
) -> WebViewBuilder<'a> {
    let ipc = hooks.clone();
    let navigation = hooks.clone();
    let popup = hooks.clone();
    let load = hooks.clone();
    let load_subs = Arc::clone(subscriptions);
    let titles = hooks.clone();
    let title_subs = Arc::clone(subscriptions);
    let title_slot = Arc::clone(title);

    builder
        .with_ipc_handler(move |request| {
            ipc.on_message(request.body());
        })
        .with_navigation_handler(move |url| !navigation.on_navigation_started(&url))
        .with_new_window_req_handler(move |url| !popup.on_new_window(&url))
        .with_on_page_load_handler(move |event, url| match event {
            PageLoadEvent::Started => {
                if is_subscribed(&load_subs, WebEvent::Navigated) {
                    load.on_source_changed(&url);
                }
            }
            PageLoadEvent::Finished => {
                load.on_dom_ready();
                if is_subscribed(&load_subs, WebEvent::Load) {
                    load.on_navigation_finished();
                }
            }
        })
        .with_document_title_changed_handler(move |title| {
            if let Ok(mut slot) = title_slot.lock() {
                *slot = title.clone();
            }
            if is_subscribed(&title_subs, WebEvent::Title) {
                titles.on_title_changed(&title);
            }
        })
}

fn respond(
    hooks: &EngineHooks,
    request: wry::http::Request<Vec<u8>>,
) -> wry::http::Response<Cow<'static, [u8]>> {
    let headers = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let request = SchemeRequest {
        url: request.uri().to_string(),
        method: request.method().to_string(),
        headers,
        body: request.body().clone(),
    };

    let response = hooks
        .on_scheme_request(request)
        .unwrap_or_else(|| SchemeResponse::from(SchemeError::NotFound));

    let mut builder = wry::http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Cow::from(response.body))
        .unwrap_or_else(|err| {
            warn!(error = %err, "invalid scheme response");
            let mut fallback = wry::http::Response::new(Cow::from(Vec::new()));
            *fallback.status_mut() = wry::http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

impl NativeEngine for WryEngine {
    fn navigate(&self, url: &str) {
        if let Err(err) = self.webview.load_url(url) {
            warn!(url, error = %err, "navigation failed");
        }
    }

    fn url(&self) -> Option<String> {
        self.webview.url().ok()
    }

    fn page_title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn back(&self) {
        self.evaluate("history.back();");
    }

    fn forward(&self) {
        self.evaluate("history.forward();");
    }

    fn reload(&self) {
        self.evaluate("location.reload();");
    }

    fn execute_script(&self, code: &str) {
        self.evaluate(code);
    }

    fn add_script_before_load(&self, code: &str) -> ScriptHandle {
        let id = self.script_ids.next_id();
        self.before_load.borrow_mut().insert(id, code.to_string());
        self.evaluate(code);
        ScriptHandle(id)
    }

    fn remove_script(&self, handle: ScriptHandle) {
        self.before_load.borrow_mut().remove(&handle.0);
    }

    fn before_dom_ready(&self) {
        let scripts: Vec<String> = self.before_load.borrow().values().cloned().collect();
        for code in &scripts {
            self.evaluate(code);
        }
    }

    // Every declared protocol already asks the core on each request.
    fn register_scheme_filter(&self, pattern: &str) {
        let scheme = pattern.trim_end_matches(":*");
        if !self.declared.iter().any(|s| s == scheme) {
            warn!(scheme, "scheme was not declared before the webview was built");
        }
    }

    fn unregister_scheme_filter(&self, pattern: &str) {
        debug!(pattern, "scheme handler removed, requests answer 404");
    }

    fn post_message(&self, text: &str) {
        self.evaluate(&receive_call(&self.global, text));
    }

    fn subscribe(&self, event: WebEvent) {
        if let Ok(mut set) = self.subscriptions.lock() {
            set.insert(event);
        }
    }

    fn unsubscribe(&self, event: WebEvent) {
        if let Ok(mut set) = self.subscriptions.lock() {
            set.remove(&event);
        }
    }

    fn start_drag(&self) {
        self.window.drag();
    }

    fn start_resize(&self, edge: Edge) {
        self.window.resize(edge);
    }

    fn dev_tools(&self) -> bool {
        self.dev_tools.get()
    }

    fn set_dev_tools(&self, enabled: bool) {
        self.dev_tools.set(enabled);
        if enabled {
            self.webview.open_devtools();
        } else {
            self.webview.close_devtools();
        }
    }

    fn context_menu(&self) -> bool {
        self.context_menu.get()
    }

    fn set_context_menu(&self, enabled: bool) {
        self.context_menu.set(enabled);
        self.evaluate(&format!("window.__weft_context_menu = {enabled};"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclaimed_requests_answer_not_found() {
        let request = wry::http::Request::builder()
            .uri("app://index.html")
            .body(Vec::new())
            .unwrap();
        let response = respond(&EngineHooks::unbound(), request);
        assert_eq!(response.status(), wry::http::StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }
}
