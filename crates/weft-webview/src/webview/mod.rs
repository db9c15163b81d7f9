//! The public webview handle.
//!
//! A [`Webview`] is `Send + Sync` and cheap to clone. Its state lives on
//! the owning thread; every method called from another thread is
//! re-issued there through the dispatcher and waits for the result.

mod hooks;
mod state;

#[cfg(test)]
mod tests;

pub use hooks::EngineHooks;

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use weft_common::InstanceId;

use crate::application::{Application, Preferences};
use crate::bridge::runtime::runtime_script;
use crate::bridge::{Bridge, CallError, CallFuture, Executor, Outbox, Unhandled};
use crate::codec::{Arguments, Parameters};
use crate::dispatch::{Affine, Dispatcher};
use crate::engine::{EngineSetup, NativeEngine};
use crate::error::WebviewError;
use crate::events::{EventKind, Icon, WebEvent};
use crate::schemes::{SchemeError, SchemeReply, SchemeRequest};
use crate::scripts::{FrameScope, LoadTime, Script};

use state::State;

pub(crate) struct Shared {
    id: InstanceId,
    dispatcher: Dispatcher,
    state: Option<Affine<State>>,
}

impl Shared {
    fn state(&self) -> Option<&State> {
        self.state.as_ref().and_then(Affine::get)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        if !state.is_owner() {
            // Tear down on the owning thread. A stopped loop drops the task
            // here and the state leaks.
            debug!(webview = %self.id, "last handle dropped off the owning thread");
            self.dispatcher.post(move || drop(state));
        }
    }
}

#[derive(Clone)]
pub struct Webview {
    shared: Arc<Shared>,
}

impl Webview {
    /// Build the native control with `factory` and wire it to a fresh core.
    ///
    /// Must run on the application's thread. Any factory failure is
    /// reported as [`WebviewError::Initialization`].
    pub fn new<E, F>(app: &Application, preferences: Preferences, factory: F) -> Result<Webview, WebviewError>
    where
        E: NativeEngine + 'static,
        F: FnOnce(EngineSetup) -> Result<E, WebviewError>,
    {
        let hooks = EngineHooks::unbound();
        let engine = factory(EngineSetup {
            hooks: hooks.clone(),
            schemes: app.schemes(),
            preferences: preferences.clone(),
        })
        .map_err(|err| match err {
            WebviewError::Initialization(_) => err,
            other => WebviewError::Initialization(other.to_string()),
        })?;

        let outbox_hooks = hooks.clone();
        let outbox: Outbox = Arc::new(move |text| outbox_hooks.deliver(text));
        let runtime = runtime_script(&preferences.bridge_global);
        let state = State::new(Rc::new(engine), Bridge::new(outbox), preferences);

        state.scripts.inject(
            &*state.engine,
            Script::new(runtime)
                .at(LoadTime::Creation)
                .frames(FrameScope::Top)
                .permanent(true),
        );

        let shared = Arc::new(Shared {
            id: InstanceId::new(),
            dispatcher: app.dispatcher(),
            state: Some(Affine::new(state)),
        });
        hooks.bind(&shared);
        app.webview_created();

        info!(webview = %shared.id, "webview created");
        Ok(Webview { shared })
    }

    pub fn id(&self) -> &InstanceId {
        &self.shared.id
    }

    pub fn is_thread_safe(&self) -> bool {
        self.shared.dispatcher.is_thread_safe()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.shared.dispatcher.clone()
    }

    /// Hooks bound to this webview, as handed to the engine factory.
    pub fn hooks(&self) -> EngineHooks {
        let hooks = EngineHooks::unbound();
        hooks.bind(&self.shared);
        hooks
    }

    /// Run `f` against the state on the owning thread, re-issuing the call
    /// there when invoked from elsewhere.
    fn with_state<R, F>(&self, f: F) -> Result<R, WebviewError>
    where
        R: Send + 'static,
        F: FnOnce(&State) -> R + Send + 'static,
    {
        if !self.is_thread_safe() {
            let this = self.clone();
            return self.shared.dispatcher.dispatch(move || this.with_state(f))?;
        }
        if !self.shared.dispatcher.is_running() {
            return Err(WebviewError::NotRunning);
        }

        match self.shared.state() {
            Some(state) if !state.is_closed() => Ok(f(state)),
            _ => Err(WebviewError::NotRunning),
        }
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    pub fn url(&self) -> Result<Option<String>, WebviewError> {
        self.with_state(|state| state.engine.url())
    }

    pub fn set_url(&self, url: impl Into<String>) -> Result<(), WebviewError> {
        let url = url.into();
        self.with_state(move |state| state.engine.navigate(&url))
    }

    /// Navigate to a local file, resolving it to an absolute `file://` URL.
    pub fn set_file(&self, path: impl AsRef<Path>) -> Result<(), WebviewError> {
        let path = std::fs::canonicalize(path)?;
        self.set_url(file_url(&path))
    }

    pub fn back(&self) -> Result<(), WebviewError> {
        self.with_state(|state| state.engine.back())
    }

    pub fn forward(&self) -> Result<(), WebviewError> {
        self.with_state(|state| state.engine.forward())
    }

    pub fn reload(&self) -> Result<(), WebviewError> {
        self.with_state(|state| state.engine.reload())
    }

    pub fn page_title(&self) -> Result<String, WebviewError> {
        self.with_state(|state| state.engine.page_title())
    }

    /// The last favicon the engine reported.
    pub fn favicon(&self) -> Result<Icon, WebviewError> {
        self.with_state(|state| state.favicon())
    }

    pub fn dev_tools(&self) -> Result<bool, WebviewError> {
        self.with_state(|state| state.engine.dev_tools())
    }

    pub fn set_dev_tools(&self, enabled: bool) -> Result<(), WebviewError> {
        self.with_state(move |state| state.engine.set_dev_tools(enabled))
    }

    pub fn context_menu(&self) -> Result<bool, WebviewError> {
        self.with_state(|state| state.engine.context_menu())
    }

    pub fn set_context_menu(&self, enabled: bool) -> Result<(), WebviewError> {
        self.with_state(move |state| state.engine.set_context_menu(enabled))
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Listen for `E`. Returns an id for [`off`](Self::off).
    pub fn on<E: EventKind>(
        &self,
        callback: impl FnMut(&E::Args) -> E::Output + Send + 'static,
    ) -> Result<u64, WebviewError> {
        self.with_state(move |state| {
            state.attach::<E>();
            E::listeners(&state.events).add(callback)
        })
    }

    pub fn once<E: EventKind>(
        &self,
        callback: impl FnMut(&E::Args) -> E::Output + Send + 'static,
    ) -> Result<u64, WebviewError> {
        self.with_state(move |state| {
            state.attach::<E>();
            E::listeners(&state.events).once(callback)
        })
    }

    pub fn off(&self, event: WebEvent, id: u64) -> Result<bool, WebviewError> {
        self.with_state(move |state| state.events.remove(event, id))
    }

    /// Remove every listener of `event`, detaching its native source.
    pub fn clear(&self, event: WebEvent) -> Result<(), WebviewError> {
        self.with_state(move |state| state.events.clear(event))
    }

    // =========================================================================
    // BRIDGE
    // =========================================================================

    pub fn expose<A, R, F>(&self, name: impl Into<String>, function: F) -> Result<(), WebviewError>
    where
        A: Arguments + 'static,
        R: Serialize + 'static,
        F: Fn(A, Executor<R>) + Send + 'static,
    {
        let name = name.into();
        self.with_state(move |state| state.bridge.expose(name, function))
    }

    pub fn unexpose(&self, name: &str) -> Result<bool, WebviewError> {
        let name = name.to_string();
        self.with_state(move |state| state.bridge.unexpose(&name))
    }

    /// Call a function the page exposed. `args` is a tuple with one element per parameter.
    pub fn call<R>(&self, name: &str, args: impl Parameters + Send + 'static) -> CallFuture<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let name = name.to_string();
        self.with_state(move |state| state.bridge.call::<R>(&name, args))
            .unwrap_or_else(|_| CallFuture::failed(CallError::NotRunning))
    }

    pub fn pending_calls(&self) -> Result<usize, WebviewError> {
        self.with_state(|state| state.bridge.pending_calls())
    }

    pub fn set_unhandled_hook(
        &self,
        hook: impl Fn(&Unhandled) + Send + 'static,
    ) -> Result<(), WebviewError> {
        self.with_state(move |state| state.bridge.set_unhandled_hook(hook))
    }

    // =========================================================================
    // SCRIPTS
    // =========================================================================

    pub fn inject(&self, script: Script) -> Result<(), WebviewError> {
        self.with_state(move |state| state.scripts.inject(&*state.engine, script))
    }

    /// Run `code` once the DOM is ready (immediately if it already is).
    pub fn execute(&self, code: impl Into<String>) -> Result<(), WebviewError> {
        let code = code.into();
        self.with_state(move |state| state.scripts.execute(&*state.engine, code))
    }

    /// Remove every script not marked permanent.
    pub fn clear_scripts(&self) -> Result<(), WebviewError> {
        self.with_state(|state| state.scripts.clear(&*state.engine))
    }

    // =========================================================================
    // SCHEMES
    // =========================================================================

    /// Handle requests for `name:*`. Returns `false` if `name` already has
    /// a handler, which is kept.
    pub fn handle_scheme(
        &self,
        name: &str,
        handler: impl Fn(&SchemeRequest) -> Result<SchemeReply, SchemeError> + Send + 'static,
    ) -> Result<bool, WebviewError> {
        let name = name.to_string();
        self.with_state(move |state| state.schemes.handle_scheme(&*state.engine, &name, handler))?
    }

    pub fn remove_scheme(&self, name: &str) -> Result<bool, WebviewError> {
        let name = name.to_string();
        self.with_state(move |state| state.schemes.remove_scheme(&*state.engine, &name))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Tear the webview down: pending calls are cancelled and every
    /// registration is dropped. Later calls fail with `NotRunning`.
    pub fn close(&self) -> Result<(), WebviewError> {
        let id = self.shared.id.clone();
        self.with_state(move |state| {
            state.teardown();
            info!(webview = %id, "webview closed");
        })
    }
}

impl std::fmt::Debug for Webview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webview")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}
