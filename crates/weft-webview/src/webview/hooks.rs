use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use super::{Shared, State, Webview};
use crate::events::Icon;
use crate::schemes::{SchemeRequest, SchemeResponse};

/// Entry points a platform adapter calls when its native control reports
/// something.
///
/// Callable from any thread; notifications from other threads are run on
/// the owning thread. Calls made before the webview finishes construction,
/// or after it is gone, are ignored.
#[derive(Clone, Default)]
pub struct EngineHooks {
    slot: Arc<OnceLock<Weak<Shared>>>,
}

impl EngineHooks {
    pub(crate) fn unbound() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, shared: &Arc<Shared>) {
        let _ = self.slot.set(Arc::downgrade(shared));
    }

    fn webview(&self) -> Option<Webview> {
        let shared = self.slot.get()?.upgrade()?;
        Some(Webview { shared })
    }

    fn with<R, F>(&self, hook: &'static str, fallback: R, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&State) -> R + Send + 'static,
    {
        let Some(webview) = self.webview() else {
            debug!(hook, "no webview bound, notification ignored");
            return fallback;
        };
        webview.with_state(f).unwrap_or_else(|err| {
            debug!(hook, error = %err, "notification ignored");
            fallback
        })
    }

    /// A raw message posted by the page runtime.
    pub fn on_message(&self, text: &str) -> bool {
        let text = text.to_string();
        self.with("message", false, move |state| state.handle_message(&text))
    }

    /// Returns `true` if the navigation must be cancelled.
    pub fn on_navigation_started(&self, url: &str) -> bool {
        let url = url.to_string();
        self.with("navigation_started", false, move |state| {
            state.navigation_started(&url)
        })
    }

    /// Returns `true` if the new window must not be opened.
    pub fn on_new_window(&self, url: &str) -> bool {
        let url = url.to_string();
        self.with("new_window", false, move |state| state.new_window(&url))
    }

    pub fn on_dom_ready(&self) {
        self.with("dom_ready", (), |state| state.dom_ready());
    }

    pub fn on_navigation_finished(&self) {
        self.with("navigation_finished", (), |state| state.navigation_finished());
    }

    pub fn on_source_changed(&self, url: &str) {
        let url = url.to_string();
        self.with("source_changed", (), move |state| state.source_changed(&url));
    }

    pub fn on_title_changed(&self, title: &str) {
        let title = title.to_string();
        self.with("title_changed", (), move |state| state.title_changed(&title));
    }

    pub fn on_favicon_changed(&self, icon: Icon) {
        self.with("favicon_changed", (), move |state| state.favicon_changed(icon));
    }

    /// `None` means no handler claims the request.
    pub fn on_scheme_request(&self, request: SchemeRequest) -> Option<SchemeResponse> {
        self.with("scheme_request", None, move |state| state.scheme_request(&request))
    }

    /// Hand outbound bridge text to the engine. Never blocks: from another
    /// thread the delivery is queued on the owning thread.
    pub(crate) fn deliver(&self, text: String) {
        let Some(webview) = self.webview() else {
            debug!("no webview bound, bridge message dropped");
            return;
        };

        let shared = webview.shared;
        if shared.dispatcher.is_thread_safe() {
            post_now(&shared, &text);
        } else {
            let dispatcher = shared.dispatcher.clone();
            dispatcher.post(move || post_now(&shared, &text));
        }
    }
}

fn post_now(shared: &Shared, text: &str) {
    match shared.state() {
        Some(state) if !state.is_closed() => state.engine.post_message(text),
        _ => debug!("webview closed, bridge message dropped"),
    }
}
