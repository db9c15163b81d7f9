use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::application::Preferences;
use crate::bridge::{Bridge, Message};
use crate::engine::NativeEngine;
use crate::events::{EventKind, Icon, LoadState, Navigation, Policy, WebEvent, WebEvents};
use crate::schemes::{SchemeRegistry, SchemeRequest, SchemeResponse};
use crate::scripts::ScriptManager;

/// Everything a webview owns. Lives on the owning thread only.
pub(crate) struct State {
    pub(crate) engine: Rc<dyn NativeEngine>,
    pub(crate) events: WebEvents,
    pub(crate) bridge: Bridge,
    pub(crate) scripts: ScriptManager,
    pub(crate) schemes: SchemeRegistry,
    pub(crate) preferences: Preferences,
    favicon: RefCell<Icon>,
    subscribed: Rc<RefCell<HashSet<WebEvent>>>,
    closed: Cell<bool>,
}

impl State {
    pub(crate) fn new(engine: Rc<dyn NativeEngine>, bridge: Bridge, preferences: Preferences) -> Self {
        Self {
            engine,
            events: WebEvents::new(),
            bridge,
            scripts: ScriptManager::new(),
            schemes: SchemeRegistry::new(),
            preferences,
            favicon: RefCell::new(Icon::default()),
            subscribed: Rc::new(RefCell::new(HashSet::new())),
            closed: Cell::new(false),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn favicon(&self) -> Icon {
        self.favicon.borrow().clone()
    }

    /// Subscribe the native source of a lazy kind on first use. Clearing the
    /// kind's listeners detaches it again.
    pub(crate) fn attach<E: EventKind>(&self) {
        let event = E::TAG;
        if !event.is_lazy() || !self.subscribed.borrow_mut().insert(event) {
            return;
        }

        self.engine.subscribe(event);
        debug!(?event, "native event attached");

        let engine = Rc::clone(&self.engine);
        let subscribed = Rc::clone(&self.subscribed);
        E::listeners(&self.events).on_clear(move || {
            subscribed.borrow_mut().remove(&event);
            engine.unsubscribe(event);
            debug!(?event, "native event detached");
        });
    }

    // =========================================================================
    // ENGINE NOTIFICATIONS
    // =========================================================================

    /// Route one raw message from the page. Returns `false` if it was dropped.
    pub(crate) fn handle_message(&self, text: &str) -> bool {
        let max = self.preferences.max_message_size;
        if text.len() > max {
            warn!(len = text.len(), max, "dropping oversized bridge message");
            return false;
        }

        match Message::parse(text) {
            Ok(Message::Resize(edge)) => self.engine.start_resize(edge),
            Ok(Message::Drag) => self.engine.start_drag(),
            Ok(Message::Call(call)) => self.bridge.handle_incoming(call),
            Ok(Message::Reply(reply)) => self.bridge.resolve_incoming(reply),
            Err(err) => {
                warn!(error = %err, "dropping malformed bridge message");
                return false;
            }
        }
        true
    }

    /// Returns `true` if a listener cancelled the navigation.
    pub(crate) fn navigation_started(&self, url: &str) -> bool {
        let navigation = Navigation {
            url: url.to_string(),
            new_window: false,
        };
        if self.events.navigate.until(&navigation, Policy::Block) {
            debug!(url, "navigation blocked");
            return true;
        }

        self.scripts.on_navigation_started();
        self.events.load.fire(&LoadState::Started);
        false
    }

    /// Returns `true` if a listener refused the new window.
    pub(crate) fn new_window(&self, url: &str) -> bool {
        let navigation = Navigation {
            url: url.to_string(),
            new_window: true,
        };
        let blocked = self.events.navigate.until(&navigation, Policy::Block);
        if blocked {
            debug!(url, "new window blocked");
        }
        blocked
    }

    pub(crate) fn dom_ready(&self) {
        self.engine.before_dom_ready();
        self.scripts.on_dom_ready(&*self.engine);
        self.events.dom_ready.fire(&());
    }

    pub(crate) fn navigation_finished(&self) {
        self.events.load.fire(&LoadState::Finished);
    }

    pub(crate) fn source_changed(&self, url: &str) {
        self.events.navigated.fire(&url.to_string());
    }

    pub(crate) fn title_changed(&self, title: &str) {
        self.events.title.fire(&title.to_string());
    }

    pub(crate) fn favicon_changed(&self, icon: Icon) {
        *self.favicon.borrow_mut() = icon.clone();
        self.events.favicon.fire(&icon);
    }

    pub(crate) fn scheme_request(&self, request: &SchemeRequest) -> Option<SchemeResponse> {
        self.schemes.respond(request)
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    pub(crate) fn teardown(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.bridge.teardown();
        self.events.clear_all();
        self.schemes.clear(&*self.engine);
        self.scripts.reset();
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.teardown();
    }
}
