//! An engine with no native control behind it.
//!
//! Every primitive is recorded as an [`EngineCall`]. The console uses it to
//! drive the bridge from stdin, and the tests use it to observe exactly what
//! the core asked the platform to do.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use tracing::trace;
use weft_common::IdSequence;

use super::{Edge, NativeEngine, ScriptHandle};
use crate::application::Preferences;
use crate::events::WebEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Navigate(String),
    Back,
    Forward,
    Reload,
    Execute(String),
    AddScript(ScriptHandle, String),
    RemoveScript(ScriptHandle),
    RegisterFilter(String),
    UnregisterFilter(String),
    PostMessage(String),
    Subscribe(WebEvent),
    Unsubscribe(WebEvent),
    StartDrag,
    StartResize(Edge),
    SetDevTools(bool),
    SetContextMenu(bool),
}

struct Inner {
    calls: RefCell<Vec<EngineCall>>,
    url: RefCell<Option<String>>,
    title: RefCell<String>,
    scripts: RefCell<BTreeMap<u64, String>>,
    filters: RefCell<Vec<String>>,
    subscriptions: RefCell<HashSet<WebEvent>>,
    dev_tools: Cell<bool>,
    context_menu: Cell<bool>,
    script_ids: IdSequence,
    observer: RefCell<Option<Box<dyn Fn(&EngineCall)>>>,
}

/// Cheap to clone; clones share the same record.
#[derive(Clone)]
pub struct HeadlessEngine {
    inner: Rc<Inner>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                calls: RefCell::new(Vec::new()),
                url: RefCell::new(None),
                title: RefCell::new(String::new()),
                scripts: RefCell::new(BTreeMap::new()),
                filters: RefCell::new(Vec::new()),
                subscriptions: RefCell::new(HashSet::new()),
                dev_tools: Cell::new(false),
                context_menu: Cell::new(true),
                script_ids: IdSequence::new(),
                observer: RefCell::new(None),
            }),
        }
    }

    pub fn with_preferences(preferences: &Preferences) -> Self {
        let engine = Self::new();
        engine.inner.dev_tools.set(preferences.dev_tools);
        engine.inner.context_menu.set(preferences.context_menu);
        engine
    }

    /// Called for every recorded primitive, after it is recorded.
    pub fn set_observer(&self, observer: impl Fn(&EngineCall) + 'static) {
        *self.inner.observer.borrow_mut() = Some(Box::new(observer));
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<EngineCall> {
        std::mem::take(&mut *self.inner.calls.borrow_mut())
    }

    /// Code passed to `execute_script`, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.inner
            .calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Execute(code) => Some(code.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bridge messages sent to the page, in call order.
    pub fn posted(&self) -> Vec<String> {
        self.inner
            .calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::PostMessage(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Scripts currently registered to run before page load.
    pub fn scripts(&self) -> Vec<String> {
        self.inner.scripts.borrow().values().cloned().collect()
    }

    pub fn filters(&self) -> Vec<String> {
        self.inner.filters.borrow().clone()
    }

    pub fn is_subscribed(&self, event: WebEvent) -> bool {
        self.inner.subscriptions.borrow().contains(&event)
    }

    /// Simulate the page changing its title.
    pub fn set_title(&self, title: impl Into<String>) {
        *self.inner.title.borrow_mut() = title.into();
    }

    fn record(&self, call: EngineCall) {
        trace!(?call, "headless engine");
        self.inner.calls.borrow_mut().push(call.clone());
        if let Some(observer) = self.inner.observer.borrow().as_ref() {
            observer(&call);
        }
    }
}

impl NativeEngine for HeadlessEngine {
    fn navigate(&self, url: &str) {
        *self.inner.url.borrow_mut() = Some(url.to_string());
        self.record(EngineCall::Navigate(url.to_string()));
    }

    fn url(&self) -> Option<String> {
        self.inner.url.borrow().clone()
    }

    fn page_title(&self) -> String {
        self.inner.title.borrow().clone()
    }

    fn back(&self) {
        self.record(EngineCall::Back);
    }

    fn forward(&self) {
        self.record(EngineCall::Forward);
    }

    fn reload(&self) {
        self.record(EngineCall::Reload);
    }

    fn execute_script(&self, code: &str) {
        self.record(EngineCall::Execute(code.to_string()));
    }

    fn add_script_before_load(&self, code: &str) -> ScriptHandle {
        let handle = ScriptHandle(self.inner.script_ids.next_id());
        self.inner
            .scripts
            .borrow_mut()
            .insert(handle.0, code.to_string());
        self.record(EngineCall::AddScript(handle, code.to_string()));
        handle
    }

    fn remove_script(&self, handle: ScriptHandle) {
        self.inner.scripts.borrow_mut().remove(&handle.0);
        self.record(EngineCall::RemoveScript(handle));
    }

    fn register_scheme_filter(&self, pattern: &str) {
        self.inner.filters.borrow_mut().push(pattern.to_string());
        self.record(EngineCall::RegisterFilter(pattern.to_string()));
    }

    fn unregister_scheme_filter(&self, pattern: &str) {
        self.inner.filters.borrow_mut().retain(|p| p != pattern);
        self.record(EngineCall::UnregisterFilter(pattern.to_string()));
    }

    fn post_message(&self, text: &str) {
        self.record(EngineCall::PostMessage(text.to_string()));
    }

    fn subscribe(&self, event: WebEvent) {
        self.inner.subscriptions.borrow_mut().insert(event);
        self.record(EngineCall::Subscribe(event));
    }

    fn unsubscribe(&self, event: WebEvent) {
        self.inner.subscriptions.borrow_mut().remove(&event);
        self.record(EngineCall::Unsubscribe(event));
    }

    fn start_drag(&self) {
        self.record(EngineCall::StartDrag);
    }

    fn start_resize(&self, edge: Edge) {
        self.record(EngineCall::StartResize(edge));
    }

    fn dev_tools(&self) -> bool {
        self.inner.dev_tools.get()
    }

    fn set_dev_tools(&self, enabled: bool) {
        self.inner.dev_tools.set(enabled);
        self.record(EngineCall::SetDevTools(enabled));
    }

    fn context_menu(&self) -> bool {
        self.inner.context_menu.get()
    }

    fn set_context_menu(&self, enabled: bool) {
        self.inner.context_menu.set(enabled);
        self.record(EngineCall::SetContextMenu(enabled));
    }
}
