//! Script injection that follows the page lifecycle.
//!
//! Creation-phase scripts are handed to the engine to run before any page
//! script. Ready-phase scripts are kept here and re-run on every dom-ready.
//! Code passed to `execute` before the DOM is ready waits in a queue that
//! is drained right after the ready-phase scripts.

use std::cell::{Cell, RefCell};

use tracing::debug;

use crate::engine::{NativeEngine, ScriptHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadTime {
    /// Before any page script runs.
    #[default]
    Creation,
    /// After the DOM is ready, on every navigation.
    Ready,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameScope {
    #[default]
    Top,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub code: String,
    pub load_time: LoadTime,
    pub frame: FrameScope,
    /// Survives [`ScriptManager::clear`].
    pub permanent: bool,
}

impl Script {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            load_time: LoadTime::default(),
            frame: FrameScope::default(),
            permanent: false,
        }
    }

    pub fn at(mut self, load_time: LoadTime) -> Self {
        self.load_time = load_time;
        self
    }

    pub fn frames(mut self, frame: FrameScope) -> Self {
        self.frame = frame;
        self
    }

    pub fn permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }
}

/// Wrap `code` so it does nothing inside child frames.
pub fn top_frame_only(code: &str) -> String {
    format!("if (self === top) {{\n{code}\n}}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    NotLoaded,
    DomReady,
}

struct Registered {
    script: Script,
    handle: ScriptHandle,
}

pub struct ScriptManager {
    state: Cell<PageState>,
    creation: RefCell<Vec<Registered>>,
    ready: RefCell<Vec<Script>>,
    pending: RefCell<Vec<String>>,
}

impl Default for ScriptManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptManager {
    pub fn new() -> Self {
        Self {
            state: Cell::new(PageState::NotLoaded),
            creation: RefCell::new(Vec::new()),
            ready: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> PageState {
        self.state.get()
    }

    pub fn inject(&self, engine: &dyn NativeEngine, script: Script) {
        match script.load_time {
            LoadTime::Ready => {
                debug!(permanent = script.permanent, "ready-phase script stored");
                self.ready.borrow_mut().push(script);
            }
            LoadTime::Creation => {
                let handle = match script.frame {
                    FrameScope::Top => engine.add_script_before_load(&top_frame_only(&script.code)),
                    FrameScope::All => engine.add_script_before_load(&script.code),
                };
                debug!(handle = handle.0, permanent = script.permanent, "creation-phase script registered");
                self.creation.borrow_mut().push(Registered { script, handle });
            }
        }
    }

    /// Run `code` now if the DOM is ready, otherwise once it is.
    pub fn execute(&self, engine: &dyn NativeEngine, code: impl Into<String>) {
        let code = code.into();
        match self.state.get() {
            PageState::DomReady => engine.execute_script(&code),
            PageState::NotLoaded => self.pending.borrow_mut().push(code),
        }
    }

    /// Drop every non-permanent script of either phase.
    pub fn clear(&self, engine: &dyn NativeEngine) {
        let removed: Vec<Registered> = {
            let mut creation = self.creation.borrow_mut();
            let (keep, removed) = std::mem::take(&mut *creation)
                .into_iter()
                .partition(|r| r.script.permanent);
            *creation = keep;
            removed
        };
        for registered in &removed {
            engine.remove_script(registered.handle);
        }

        self.ready.borrow_mut().retain(|script| script.permanent);
        debug!(removed = removed.len(), "scripts cleared");
    }

    pub fn on_navigation_started(&self) {
        self.state.set(PageState::NotLoaded);
    }

    pub fn on_dom_ready(&self, engine: &dyn NativeEngine) {
        self.state.set(PageState::DomReady);

        let ready: Vec<String> = self.ready.borrow().iter().map(|s| s.code.clone()).collect();
        for code in &ready {
            engine.execute_script(code);
        }

        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        debug!(ready = ready.len(), pending = pending.len(), "dom ready");
        for code in &pending {
            engine.execute_script(code);
        }
    }

    /// Forget everything, permanent scripts included.
    pub fn reset(&self) {
        self.creation.borrow_mut().clear();
        self.ready.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        self.state.set(PageState::NotLoaded);
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}
